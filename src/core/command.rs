//! Commands: parameter parsing, callback invocation and the process boundary

use crate::core::context::{Context, ContextSettings};
use crate::core::multi::{
    CHAIN_NESTING_ERROR, CommandCollection, CommandSource, Group, MultiCommand, ResultCallback,
};
use crate::core::parameter::{ArgumentBuilder, OptionBuilder, Parameter};
use crate::core::presets;
use crate::core::value::Value;
use crate::error::{CliError, Result};
use crate::formatting::HelpFormatter;
use crate::parser::{Arity, OptionParser};
use crate::system::System;
use crate::utils::make_default_short_help;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Maximum width of the short help shown in command listings
const SHORT_HELP_WIDTH: usize = 45;

/// Command body, called with the fully resolved context
pub type CommandCallback = Rc<dyn Fn(&Context<'_>) -> Result<Value>>;

/// A command: its parameters, its callback and (for groups) its subcommands
pub struct Command {
    name: String,
    params: Vec<Parameter>,
    callback: Option<CommandCallback>,
    help: Option<String>,
    short_help: Option<String>,
    epilog: Option<String>,
    options_metavar: String,
    add_help_option: bool,
    hidden: bool,
    context_settings: ContextSettings,
    multi: Option<MultiCommand>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("help", &self.help)
            .field("hidden", &self.hidden)
            .field("multi", &self.multi)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Start building a plain command
    pub fn new(name: &str) -> CommandBuilder {
        CommandBuilder::new(name, None)
    }

    /// Start building a group of named subcommands
    pub fn group(name: &str) -> CommandBuilder {
        CommandBuilder::new(name, Some(SourceKind::Group(Group::new())))
    }

    /// Start building a command that merges several command sources
    pub fn collection(name: &str) -> CommandBuilder {
        CommandBuilder::new(name, Some(SourceKind::Collection(CommandCollection::new())))
    }

    /// Start building a multi-command backed by a custom source
    pub fn multi_source<S: CommandSource + 'static>(name: &str, source: S) -> CommandBuilder {
        CommandBuilder::new(name, Some(SourceKind::Custom(Box::new(source))))
    }

    /// Registered name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters, in declaration order
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Help text
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Whether the command is left out of command listings
    #[must_use]
    pub const fn hidden(&self) -> bool {
        self.hidden
    }

    /// Subcommand dispatch, for groups and collections
    #[must_use]
    pub const fn multi(&self) -> Option<&MultiCommand> {
        self.multi.as_ref()
    }

    /// Short help shown in a parent's command listing
    #[must_use]
    pub fn short_help_str(&self) -> String {
        if let Some(short) = self.short_help.as_ref() {
            return short.clone();
        }
        self.help
            .as_deref()
            .map(|help| make_default_short_help(help, SHORT_HELP_WIDTH))
            .unwrap_or_default()
    }

    pub(crate) const fn allows_extra_args(&self) -> bool {
        self.multi.is_some()
    }

    pub(crate) const fn allows_interspersed_args(&self) -> bool {
        self.multi.is_none()
    }

    pub(crate) const fn ignores_unknown_options(&self) -> bool {
        false
    }

    /// Help option names not already taken by a declared option
    fn help_option_names(&self, ctx: &Context<'_>) -> Vec<String> {
        if !self.add_help_option {
            return Vec::new();
        }
        ctx.help_option_names()
            .iter()
            .filter(|name| {
                !self.params.iter().any(|param| {
                    param.opts().contains(name) || param.secondary_opts().contains(name)
                })
            })
            .cloned()
            .collect()
    }

    /// Whether a help option applies in `ctx`
    #[must_use]
    pub fn has_help_option(&self, ctx: &Context<'_>) -> bool {
        !self.help_option_names(ctx).is_empty()
    }

    /// The automatic help option for `ctx`, if any
    ///
    /// # Errors
    ///
    /// Returns a declaration error for unusable help option names
    pub fn help_option(&self, ctx: &Context<'_>) -> Result<Option<Parameter>> {
        let names = self.help_option_names(ctx);
        if names.is_empty() {
            return Ok(None);
        }
        presets::help_option(names).build().map(Some)
    }

    /// Build a root context and parse `args` into it
    ///
    /// # Errors
    ///
    /// Returns usage, conversion and missing-parameter errors, and the exit
    /// signal raised by eager options such as help
    pub fn make_context<'a>(
        &'a self,
        info_name: &str,
        args: Vec<String>,
        system: &'a dyn System,
        settings: ContextSettings,
    ) -> Result<Context<'a>> {
        let mut ctx = Context::new(
            self,
            None,
            system,
            Some(info_name.to_owned()),
            self.context_settings.overlay(settings),
        );
        self.parse_args(&mut ctx, args)?;
        Ok(ctx)
    }

    /// Build a context chained to `parent` and parse `args` into it
    ///
    /// # Errors
    ///
    /// Same as [`Self::make_context`]
    pub fn make_child_context<'a>(
        &'a self,
        parent: &'a Context<'a>,
        info_name: &str,
        args: Vec<String>,
        settings: ContextSettings,
    ) -> Result<Context<'a>> {
        let mut ctx = Context::new(
            self,
            Some(parent),
            parent.system(),
            Some(info_name.to_owned()),
            self.context_settings.overlay(settings),
        );
        self.parse_args(&mut ctx, args)?;
        Ok(ctx)
    }

    /// Resolve every parameter from `args` and store the leftovers
    ///
    /// Groups split leftovers into the subcommand name (`protected_args`)
    /// and its arguments (`args`); chain groups keep all of them protected.
    ///
    /// # Errors
    ///
    /// Returns usage, conversion and missing-parameter errors
    pub fn parse_args(&self, ctx: &mut Context<'_>, args: Vec<String>) -> Result<Vec<String>> {
        if let Some(multi) = self.multi.as_ref()
            && args.is_empty()
            && multi.no_args_is_help()
            && !ctx.resilient_parsing()
        {
            ctx.system().echo(&format!("{}\n", ctx.get_help()));
            return Err(ctx.exit(0));
        }

        let rest = self.parse_own_args(ctx, args)?;

        if let Some(multi) = self.multi.as_ref() {
            if multi.chain() {
                ctx.set_protected_args(rest);
                ctx.set_args(Vec::new());
            } else if !rest.is_empty() {
                let mut rest = rest.into_iter();
                ctx.set_protected_args(rest.next().into_iter().collect());
                ctx.set_args(rest.collect());
            }
            return Ok(ctx.args().to_vec());
        }
        Ok(rest)
    }

    /// Resolve this command's own parameters, without the group-level
    /// no-arguments help or leftover splitting
    pub(crate) fn parse_own_args(&self, ctx: &mut Context<'_>, args: Vec<String>) -> Result<Vec<String>> {
        let help = self
            .help_option(ctx)
            .map_err(|e| e.with_usage(|| ctx.usage_info()))?;
        let params: Vec<&Parameter> = self.params.iter().chain(help.as_ref()).collect();

        let mut parser = OptionParser::new(
            ctx.allow_interspersed_args(),
            ctx.ignore_unknown_options(),
            ctx.token_normalize().cloned(),
        );
        for (index, param) in params.iter().enumerate() {
            param.add_to_parser(&mut parser, index)?;
        }

        let outcome = parser
            .parse_args(args, ctx.resilient_parsing())
            .map_err(|e| e.with_usage(|| ctx.usage_info()))?;

        for index in processing_order(&params, &outcome.order) {
            if let Some(param) = params.get(index) {
                param.handle_parse_result(ctx, &outcome.opts)?;
            }
        }

        let rest = outcome.args;
        if !rest.is_empty() && !ctx.allow_extra_args() && !ctx.resilient_parsing() {
            let plural = if rest.len() == 1 { "" } else { "s" };
            return Err(ctx.fail(format!(
                "Got unexpected extra argument{plural} ({})",
                rest.join(" ")
            )));
        }

        ctx.set_args(rest.clone());
        Ok(rest)
    }

    /// Run the command in `ctx`: its own callback, then any subcommands
    ///
    /// # Errors
    ///
    /// Returns whatever the callbacks or subcommand resolution fail with
    pub fn invoke(&self, ctx: &Context<'_>) -> Result<Value> {
        match self.multi.as_ref() {
            Some(multi) => multi.invoke(self, ctx),
            None => {
                let _scope = ctx.scope();
                self.invoke_callback(ctx)
            }
        }
    }

    /// Call only this command's own callback
    ///
    /// # Errors
    ///
    /// Returns the callback's error, attributed to `ctx`
    pub fn invoke_callback(&self, ctx: &Context<'_>) -> Result<Value> {
        let Some(callback) = self.callback.as_ref() else {
            return Ok(Value::Unit);
        };
        debug!("Invoking {}", ctx.command_path());
        callback(ctx).map_err(|e| e.with_usage(|| ctx.usage_info()))
    }

    /// Parse `args` and run, returning the result without rendering errors
    ///
    /// # Errors
    ///
    /// Returns every error, including exit and abort signals
    pub fn run(
        &self,
        args: Vec<String>,
        prog_name: &str,
        system: &dyn System,
        settings: ContextSettings,
    ) -> Result<Value> {
        let ctx = self.make_context(prog_name, args, system, settings)?;
        self.invoke(&ctx)
    }

    /// Run as the program entry point and return the exit code
    ///
    /// Errors are rendered to the error stream of `system`.
    pub fn main(
        &self,
        args: Vec<String>,
        prog_name: &str,
        system: &dyn System,
        settings: ContextSettings,
    ) -> i32 {
        match self.run(args, prog_name, system, settings) {
            Ok(_) => 0,
            Err(e) => {
                debug!("{prog_name} finished with error: {e:?}");
                e.show(system);
                e.exit_code()
            }
        }
    }

    fn usage_pieces(&self) -> Vec<String> {
        let mut pieces = vec![self.options_metavar.clone()];
        for param in &self.params {
            pieces.extend(param.usage_pieces());
        }
        if let Some(multi) = self.multi.as_ref() {
            pieces.push(multi.subcommand_metavar().to_owned());
        }
        pieces
    }

    /// Rendered usage line
    #[must_use]
    pub fn get_usage(&self, ctx: &Context<'_>) -> String {
        let mut formatter = HelpFormatter::new();
        formatter.write_usage(&ctx.command_path(), &self.usage_pieces().join(" "));
        formatter.into_string()
    }

    /// Rendered help page
    #[must_use]
    pub fn get_help(&self, ctx: &Context<'_>) -> String {
        let mut formatter = HelpFormatter::new();
        formatter.write_usage(&ctx.command_path(), &self.usage_pieces().join(" "));

        if let Some(help) = self.help.as_deref() {
            formatter.write_paragraph();
            formatter.indented(|f| f.write_text(help));
        }

        let help_param = self.help_option(ctx).ok().flatten();
        let rows: Vec<(String, String)> = self
            .params
            .iter()
            .chain(help_param.as_ref())
            .filter_map(Parameter::help_record)
            .collect();
        if !rows.is_empty() {
            formatter.section("Options", |f| f.write_dl(&rows));
        }

        if let Some(multi) = self.multi.as_ref() {
            let rows: Vec<(String, String)> = multi
                .source()
                .list_commands(ctx)
                .into_iter()
                .filter_map(|name| {
                    let command = multi.source().get_command(ctx, &name)?;
                    (!command.hidden).then(|| (name, command.short_help_str()))
                })
                .collect();
            if !rows.is_empty() {
                formatter.section("Commands", |f| f.write_dl(&rows));
            }
        }

        if let Some(epilog) = self.epilog.as_deref() {
            formatter.write_paragraph();
            formatter.indented(|f| f.write_text(epilog));
        }

        formatter.into_string()
    }
}

/// Eager parameters first; within each bucket, command-line order, unseen last
fn processing_order(params: &[&Parameter], order: &[usize]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..params.len()).collect();
    indices.sort_by_key(|&index| {
        let eager = params.get(index).is_some_and(|p| p.is_eager());
        let seen = order
            .iter()
            .position(|&seen| seen == index)
            .unwrap_or(usize::MAX);
        (!eager, seen)
    });
    indices
}

enum SourceKind {
    Group(Group),
    Collection(CommandCollection),
    Custom(Box<dyn CommandSource>),
}

/// Builder for [`Command`]
#[must_use]
pub struct CommandBuilder {
    name: String,
    params: Vec<Parameter>,
    callback: Option<CommandCallback>,
    help: Option<String>,
    short_help: Option<String>,
    epilog: Option<String>,
    options_metavar: String,
    add_help_option: bool,
    hidden: bool,
    context_settings: ContextSettings,
    source: Option<SourceKind>,
    chain: bool,
    invoke_without_command: bool,
    no_args_is_help: Option<bool>,
    subcommand_metavar: Option<String>,
    result_callback: Option<ResultCallback>,
    error: Option<CliError>,
}

impl CommandBuilder {
    fn new(name: &str, source: Option<SourceKind>) -> Self {
        Self {
            name: name.to_owned(),
            params: Vec::new(),
            callback: None,
            help: None,
            short_help: None,
            epilog: None,
            options_metavar: "[OPTIONS]".to_owned(),
            add_help_option: true,
            hidden: false,
            context_settings: ContextSettings::default(),
            source,
            chain: false,
            invoke_without_command: false,
            no_args_is_help: None,
            subcommand_metavar: None,
            result_callback: None,
            error: None,
        }
    }

    fn record(&mut self, error: CliError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Declare an option
    pub fn option(mut self, option: OptionBuilder) -> Self {
        match option.build() {
            Ok(param) => self.params.push(param),
            Err(e) => self.record(e),
        }
        self
    }

    /// Declare a positional argument
    pub fn argument(mut self, argument: ArgumentBuilder) -> Self {
        match argument.build() {
            Ok(param) => self.params.push(param),
            Err(e) => self.record(e),
        }
        self
    }

    /// Add an already built parameter
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Command body
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<Value> + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Register a subcommand under its own name
    pub fn subcommand(self, command: Command) -> Self {
        let name = command.name.clone();
        self.subcommand_as(&name, command)
    }

    /// Register a subcommand under `name`
    pub fn subcommand_as(mut self, name: &str, command: Command) -> Self {
        match self.source {
            Some(SourceKind::Group(ref mut group)) => group.add_command_as(name, command),
            _ => self.record(CliError::declaration(format!(
                "Command {} does not accept subcommands",
                self.name
            ))),
        }
        self
    }

    /// Add a source to a collection
    pub fn source<S: CommandSource + 'static>(mut self, source: S) -> Self {
        match self.source {
            Some(SourceKind::Collection(ref mut collection)) => collection.add_source(source),
            _ => self.record(CliError::declaration(format!(
                "Command {} is not a command collection",
                self.name
            ))),
        }
        self
    }

    /// Allow several subcommands in one invocation
    pub const fn chain(mut self, chain: bool) -> Self {
        self.chain = chain;
        self
    }

    /// Run the group callback even when no subcommand is given
    pub const fn invoke_without_command(mut self, invoke: bool) -> Self {
        self.invoke_without_command = invoke;
        self
    }

    /// Show help when called without arguments
    pub const fn no_args_is_help(mut self, show: bool) -> Self {
        self.no_args_is_help = Some(show);
        self
    }

    /// Usage placeholder for the subcommand part
    pub fn subcommand_metavar(mut self, metavar: &str) -> Self {
        self.subcommand_metavar = Some(metavar.to_owned());
        self
    }

    /// Post-process subcommand results
    ///
    /// A callback registered earlier runs first; this one receives its output.
    pub fn result_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Context<'_>, Value) -> Result<Value> + 'static,
    {
        let callback: ResultCallback = match self.result_callback.take() {
            Some(previous) => Rc::new(move |ctx: &Context<'_>, value: Value| {
                let inner = previous(ctx, value)?;
                callback(ctx, inner)
            }),
            None => Rc::new(callback),
        };
        self.result_callback = Some(callback);
        self
    }

    /// Post-process subcommand results, dropping earlier registrations
    pub fn replace_result_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Context<'_>, Value) -> Result<Value> + 'static,
    {
        self.result_callback = Some(Rc::new(callback));
        self
    }

    /// Help text
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_owned());
        self
    }

    /// Short help for command listings
    pub fn short_help(mut self, short_help: &str) -> Self {
        self.short_help = Some(short_help.to_owned());
        self
    }

    /// Text printed after the help page
    pub fn epilog(mut self, epilog: &str) -> Self {
        self.epilog = Some(epilog.to_owned());
        self
    }

    /// Usage placeholder for options
    pub fn options_metavar(mut self, metavar: &str) -> Self {
        self.options_metavar = metavar.to_owned();
        self
    }

    /// Whether the automatic help option is added
    pub const fn add_help_option(mut self, add: bool) -> Self {
        self.add_help_option = add;
        self
    }

    /// Leave out of command listings
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Settings applied to every context made for this command
    pub fn context_settings(mut self, settings: ContextSettings) -> Self {
        self.context_settings = settings;
        self
    }

    /// Validate and build the command
    ///
    /// # Errors
    ///
    /// Returns the first declaration error recorded while building, or a
    /// structural error: two variadic arguments, optional arguments or
    /// nested groups under a chain group
    pub fn build(self) -> Result<Command> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let variadic = self
            .params
            .iter()
            .filter(|param| param.is_argument() && param.arity() == Arity::Variadic)
            .count();
        if variadic > 1 {
            return Err(CliError::declaration(format!(
                "Command {} has more than one variadic argument",
                self.name
            )));
        }

        let multi = match self.source {
            None => {
                if self.chain || self.result_callback.is_some() {
                    return Err(CliError::declaration(format!(
                        "Command {} has no subcommands to chain or post-process",
                        self.name
                    )));
                }
                None
            }
            Some(source) => {
                if self.chain {
                    if self
                        .params
                        .iter()
                        .any(|param| param.is_argument() && !param.required())
                    {
                        return Err(CliError::declaration(
                            "Multi commands in chain mode cannot have optional arguments.",
                        ));
                    }
                    if let SourceKind::Group(ref group) = source
                        && group.commands().any(|command| command.multi.is_some())
                    {
                        return Err(CliError::declaration(CHAIN_NESTING_ERROR));
                    }
                }

                let source: Box<dyn CommandSource> = match source {
                    SourceKind::Group(group) => Box::new(group),
                    SourceKind::Collection(collection) => Box::new(collection),
                    SourceKind::Custom(custom) => custom,
                };
                Some(MultiCommand::new(
                    source,
                    self.chain,
                    self.invoke_without_command,
                    self.no_args_is_help,
                    self.subcommand_metavar,
                    self.result_callback,
                ))
            }
        };

        Ok(Command {
            name: self.name,
            params: self.params,
            callback: self.callback,
            help: self.help,
            short_help: self.short_help,
            epilog: self.epilog,
            options_metavar: self.options_metavar,
            add_help_option: self.add_help_option,
            hidden: self.hidden,
            context_settings: self.context_settings,
            multi,
        })
    }
}
