//! Shell completion
//!
//! Completion is an explicit entry point: the host decides when to call
//! [`complete`] (for instance from a hidden subcommand) instead of the
//! library sniffing the process environment. Parsing runs in resilient mode
//! so half-typed command lines never prompt, fail or exit.

use crate::core::command::Command;
use crate::core::context::{Context, ContextSettings};
use crate::core::parameter::Parameter;
use crate::error::Result;
use crate::parser::Arity;
use crate::system::System;
use tracing::debug;

fn start_of_option(token: &str) -> bool {
    token.chars().next().is_some_and(|c| !c.is_alphanumeric())
}

fn leftovers(ctx: &Context<'_>) -> Vec<String> {
    ctx.protected_args()
        .iter()
        .chain(ctx.args())
        .cloned()
        .collect()
}

/// Candidates for `incomplete`, given the complete tokens before it
///
/// # Errors
///
/// Returns declaration errors from the command tree; parse failures are
/// tolerated
pub fn complete(
    command: &Command,
    prog_name: &str,
    args: &[String],
    incomplete: &str,
    system: &dyn System,
) -> Result<Vec<String>> {
    let settings = ContextSettings::new().resilient_parsing(true);
    let ctx = command.make_context(prog_name, args.to_vec(), system, settings)?;
    let rest = leftovers(&ctx);
    descend(&ctx, rest, args, incomplete)
}

/// Follow subcommand names down to the innermost context
fn descend(
    ctx: &Context<'_>,
    rest: Vec<String>,
    all_args: &[String],
    incomplete: &str,
) -> Result<Vec<String>> {
    let Some(multi) = ctx.command().multi() else {
        return Ok(candidates(ctx, all_args, incomplete));
    };
    let Some(first) = rest.first() else {
        return Ok(candidates(ctx, all_args, incomplete));
    };

    if !multi.chain() {
        let Some((name, command)) = multi.lookup(ctx, first) else {
            return Ok(candidates(ctx, all_args, incomplete));
        };
        let tail = rest.get(1..).unwrap_or_default().to_vec();
        let sub_ctx = command.make_child_context(ctx, &name, tail, ContextSettings::default())?;
        let sub_rest = leftovers(&sub_ctx);
        return descend(&sub_ctx, sub_rest, all_args, incomplete);
    }

    let mut rest = rest;
    let mut last: Option<Context<'_>> = None;
    while let Some(first) = rest.first() {
        let Some((name, command)) = multi.lookup(ctx, first) else {
            return Ok(candidates(ctx, all_args, incomplete));
        };
        let tail = rest.get(1..).unwrap_or_default().to_vec();
        let mut sub_ctx = command.make_child_context(
            ctx,
            &name,
            tail,
            ContextSettings::new()
                .allow_extra_args(true)
                .allow_interspersed_args(false),
        )?;
        rest = sub_ctx.take_args();
        last = Some(sub_ctx);
    }

    Ok(match last.as_ref() {
        Some(sub_ctx) => candidates(sub_ctx, all_args, incomplete),
        None => candidates(ctx, all_args, incomplete),
    })
}

/// The option whose values are still being typed, if any
fn pending_option<'p>(params: &[&'p Parameter], all_args: &[String]) -> Option<&'p Parameter> {
    params.iter().copied().find(|param| {
        let Some(spec) = param.option_spec() else {
            return false;
        };
        if spec.is_flag() || spec.is_count() {
            return false;
        }
        let nargs = match param.arity() {
            Arity::Fixed(n) => n,
            Arity::Variadic => 1,
        };
        all_args
            .iter()
            .rev()
            .take(nargs)
            .filter(|token| start_of_option(token))
            .last()
            .is_some_and(|token| param.opts().contains(token))
    })
}

fn matching_choices(param: &Parameter, incomplete: &str) -> Vec<String> {
    param
        .param_type()
        .choices()
        .unwrap_or_default()
        .iter()
        .filter(|choice| choice.starts_with(incomplete))
        .cloned()
        .collect()
}

fn candidates(ctx: &Context<'_>, all_args: &[String], incomplete: &str) -> Vec<String> {
    let command = ctx.command();
    let help = command.help_option(ctx).ok().flatten();
    let params: Vec<&Parameter> = command.params().iter().chain(help.as_ref()).collect();

    if start_of_option(incomplete) {
        let mut found: Vec<String> = params
            .iter()
            .copied()
            .filter(|param| !param.is_argument() && !param.hidden())
            .flat_map(|param| {
                param
                    .opts()
                    .iter()
                    .chain(param.secondary_opts())
                    .filter(move |opt| param.multiple() || !all_args.contains(opt))
            })
            .filter(|opt| opt.starts_with(incomplete))
            .cloned()
            .collect();
        found.sort();
        return found;
    }

    if let Some(param) = pending_option(&params, all_args) {
        debug!("Completing values of {}", param.name());
        return matching_choices(param, incomplete);
    }

    if let Some(param) = params.iter().find(|param| {
        param.is_argument()
            && param.param_type().choices().is_some()
            && ctx.param(param.name()).is_none()
    }) {
        debug!("Completing argument {}", param.name());
        return matching_choices(param, incomplete);
    }

    let mut found: Vec<String> = Vec::new();
    let mut add_commands = |owner: &Context<'_>| {
        if let Some(multi) = owner.command().multi() {
            for name in multi.source().list_commands(owner) {
                if name.starts_with(incomplete)
                    && multi
                        .source()
                        .get_command(owner, &name)
                        .is_some_and(|cmd| !cmd.hidden())
                {
                    found.push(name);
                }
            }
        }
    };
    add_commands(ctx);
    if let Some(parent) = ctx.parent()
        && parent.command().multi().is_some_and(|multi| multi.chain())
        && command.multi().is_none()
    {
        add_commands(parent);
    }
    found.sort();
    found.dedup();
    found
}
