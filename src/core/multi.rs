//! Subcommand dispatch
//!
//! A multi-command resolves child commands by name from the tokens left
//! after its own parameters, either one child per invocation or, in chain
//! mode, as many as the tokens name. Children come from a [`CommandSource`]:
//! a [`Group`] of registered commands, a [`CommandCollection`] merging
//! several sources, or anything else implementing the trait.

use crate::core::command::Command;
use crate::core::context::{Context, ContextSettings};
use crate::core::value::Value;
use crate::error::{CliError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

pub(crate) const CHAIN_NESTING_ERROR: &str = "It is not possible to add multi commands as children to another multi command that is in chain mode.";

/// Post-processing of subcommand results
///
/// Receives the multi-command's own context and the subcommand result (a
/// [`Value::List`] of every result in chain mode).
pub type ResultCallback = Rc<dyn Fn(&Context<'_>, Value) -> Result<Value>>;

/// Where a multi-command looks up its children
pub trait CommandSource {
    /// The command registered under `name`
    fn get_command(&self, ctx: &Context<'_>, name: &str) -> Option<&Command>;

    /// Names of every available command, in listing order
    fn list_commands(&self, ctx: &Context<'_>) -> Vec<String>;
}

/// Named subcommands
#[derive(Debug, Default)]
pub struct Group {
    commands: BTreeMap<String, Command>,
}

impl Group {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` under its own name
    pub fn add_command(&mut self, command: Command) {
        let name = command.name().to_owned();
        self.add_command_as(&name, command);
    }

    /// Register `command` under `name`, replacing any previous entry
    pub fn add_command_as(&mut self, name: &str, command: Command) {
        self.commands.insert(name.to_owned(), command);
    }

    /// Builder form of [`Self::add_command`]
    #[must_use]
    pub fn with_command(mut self, command: Command) -> Self {
        self.add_command(command);
        self
    }

    /// Every registered command
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }
}

impl CommandSource for Group {
    fn get_command(&self, _ctx: &Context<'_>, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    fn list_commands(&self, _ctx: &Context<'_>) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

/// Several sources merged; the first source defining a name wins
#[derive(Default)]
pub struct CommandCollection {
    sources: Vec<Box<dyn CommandSource>>,
}

impl CommandCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; earlier sources take precedence
    pub fn add_source<S: CommandSource + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }
}

impl fmt::Debug for CommandCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCollection")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl CommandSource for CommandCollection {
    fn get_command(&self, ctx: &Context<'_>, name: &str) -> Option<&Command> {
        self.sources
            .iter()
            .find_map(|source| source.get_command(ctx, name))
    }

    fn list_commands(&self, ctx: &Context<'_>) -> Vec<String> {
        let names: BTreeSet<String> = self
            .sources
            .iter()
            .flat_map(|source| source.list_commands(ctx))
            .collect();
        names.into_iter().collect()
    }
}

/// Subcommand dispatch attached to a [`Command`]
pub struct MultiCommand {
    source: Box<dyn CommandSource>,
    chain: bool,
    invoke_without_command: bool,
    no_args_is_help: bool,
    subcommand_metavar: String,
    result_callback: Option<ResultCallback>,
}

impl fmt::Debug for MultiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiCommand")
            .field("chain", &self.chain)
            .field("invoke_without_command", &self.invoke_without_command)
            .field("no_args_is_help", &self.no_args_is_help)
            .field("subcommand_metavar", &self.subcommand_metavar)
            .finish_non_exhaustive()
    }
}

impl MultiCommand {
    pub(crate) fn new(
        source: Box<dyn CommandSource>,
        chain: bool,
        invoke_without_command: bool,
        no_args_is_help: Option<bool>,
        subcommand_metavar: Option<String>,
        result_callback: Option<ResultCallback>,
    ) -> Self {
        let subcommand_metavar = subcommand_metavar.unwrap_or_else(|| {
            if chain {
                "COMMAND1 [ARGS]... [COMMAND2 [ARGS]...]...".to_owned()
            } else {
                "COMMAND [ARGS]...".to_owned()
            }
        });
        Self {
            source,
            chain,
            invoke_without_command,
            no_args_is_help: no_args_is_help.unwrap_or(!invoke_without_command),
            subcommand_metavar,
            result_callback,
        }
    }

    /// Where children are looked up
    #[must_use]
    pub fn source(&self) -> &dyn CommandSource {
        self.source.as_ref()
    }

    /// Whether several subcommands may run in one invocation
    #[must_use]
    pub const fn chain(&self) -> bool {
        self.chain
    }

    /// Whether the own callback runs without a subcommand
    #[must_use]
    pub const fn invoke_without_command(&self) -> bool {
        self.invoke_without_command
    }

    /// Whether an empty invocation prints help
    #[must_use]
    pub const fn no_args_is_help(&self) -> bool {
        self.no_args_is_help
    }

    /// Usage placeholder for the subcommand part
    #[must_use]
    pub fn subcommand_metavar(&self) -> &str {
        &self.subcommand_metavar
    }

    fn process_result(&self, ctx: &Context<'_>, value: Value) -> Result<Value> {
        match self.result_callback.as_ref() {
            Some(callback) => callback(ctx, value).map_err(|e| e.with_usage(|| ctx.usage_info())),
            None => Ok(value),
        }
    }

    /// Look up a child by name, retrying with the token normalizer
    ///
    /// Returns the name the child was found under.
    pub fn lookup<'c>(&'c self, ctx: &Context<'_>, name: &str) -> Option<(String, &'c Command)> {
        if let Some(command) = self.source.get_command(ctx, name) {
            return Some((name.to_owned(), command));
        }
        let normalize = ctx.token_normalize()?;
        let normalized = normalize(name);
        self.source
            .get_command(ctx, &normalized)
            .map(|command| (normalized, command))
    }

    /// Resolve the first token of `args` to a child command
    ///
    /// An unknown name that looks like an option first re-parses the
    /// remaining tokens against the owner, so that help and other eager
    /// options still take effect.
    fn resolve_command<'c>(
        &'c self,
        owner: &Command,
        ctx: &Context<'_>,
        args: Vec<String>,
    ) -> Result<(String, &'c Command, Vec<String>)> {
        let mut tokens = args.into_iter();
        let Some(original) = tokens.next() else {
            return Err(ctx.fail("Missing command."));
        };
        let rest: Vec<String> = tokens.collect();

        if let Some((name, command)) = self.lookup(ctx, &original) {
            debug!("Resolved subcommand {name} of {}", ctx.command_path());
            return Ok((name, command, rest));
        }

        if !ctx.resilient_parsing() && ctx.looks_like_option(&original) {
            let mut probe = ctx.probe();
            if let Err(e) = owner.parse_own_args(&mut probe, rest)
                && matches!(e, CliError::Exit { .. } | CliError::Abort)
            {
                return Err(e);
            }
        }
        Err(ctx.fail(format!("No such command \"{original}\".")))
    }

    /// Run the owner's callback and dispatch to the children named in `ctx`
    ///
    /// # Errors
    ///
    /// Returns `Missing command.` or `No such command` usage errors, and
    /// whatever the callbacks fail with
    pub(crate) fn invoke(&self, owner: &Command, ctx: &Context<'_>) -> Result<Value> {
        let _scope = ctx.scope();

        if ctx.protected_args().is_empty() {
            if !self.invoke_without_command {
                return Err(ctx.fail("Missing command."));
            }
            let own = owner.invoke_callback(ctx)?;
            if !self.chain {
                return Ok(own);
            }
            return self.process_result(ctx, Value::List(Vec::new()));
        }

        let mut args: Vec<String> = ctx
            .protected_args()
            .iter()
            .chain(ctx.args())
            .cloned()
            .collect();

        if !self.chain {
            let (name, command, rest) = self.resolve_command(owner, ctx, args)?;
            ctx.set_invoked_subcommand(Some(name.clone()));
            owner.invoke_callback(ctx)?;

            let sub_ctx = command.make_child_context(ctx, &name, rest, ContextSettings::default())?;
            let _sub_scope = sub_ctx.scope();
            let value = command.invoke(&sub_ctx)?;
            return self.process_result(ctx, value);
        }

        ctx.set_invoked_subcommand(Some("*".to_owned()));
        owner.invoke_callback(ctx)?;

        let mut contexts = Vec::new();
        while !args.is_empty() {
            let (name, command, rest) = self.resolve_command(owner, ctx, args)?;
            if command.multi().is_some() {
                return Err(CliError::declaration(CHAIN_NESTING_ERROR));
            }
            let mut sub_ctx = command.make_child_context(
                ctx,
                &name,
                rest,
                ContextSettings::new()
                    .allow_extra_args(true)
                    .allow_interspersed_args(false),
            )?;
            args = sub_ctx.take_args();
            contexts.push(sub_ctx);
        }

        let mut results = Vec::with_capacity(contexts.len());
        for sub_ctx in &contexts {
            let _sub_scope = sub_ctx.scope();
            results.push(sub_ctx.command().invoke(sub_ctx)?);
        }
        self.process_result(ctx, Value::List(results))
    }
}
