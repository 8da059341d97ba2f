//! Options and arguments
//!
//! A [`Parameter`] is an immutable descriptor built with [`OptionBuilder`] or
//! [`ArgumentBuilder`]. Resolution of its final value happens in
//! [`Parameter::handle_parse_result`], in this order: command line, default
//! map, environment, prompt, declared default. The converted value then goes
//! through the required check and the user callback.

use crate::core::context::Context;
use crate::core::value::{RawValue, Value};
use crate::error::{CliError, Result};
use crate::parser::{Action, Arity, OptionParser, split_opt};
use crate::termui::{self, PromptOptions};
use crate::types::{BoolType, IntRange, ParamType, TypeRef, guess_type};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::{debug, warn};

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

fn is_identifier(decl: &str) -> bool {
    IDENTIFIER
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(decl))
}

/// Callback run on a parameter's value once it is resolved
///
/// The returned value replaces the resolved one.
pub type ParamCallback =
    Rc<dyn Fn(&Context<'_>, &Parameter, Option<Value>) -> Result<Option<Value>>>;

/// Declared default of a parameter
#[derive(Clone)]
pub enum DefaultValue {
    Static(RawValue),
    Producer(Rc<dyn Fn() -> RawValue>),
}

impl DefaultValue {
    fn resolve(&self) -> RawValue {
        match *self {
            Self::Static(ref value) => value.clone(),
            Self::Producer(ref producer) => producer(),
        }
    }

    const fn as_static(&self) -> Option<&RawValue> {
        match *self {
            Self::Static(ref value) => Some(value),
            Self::Producer(_) => None,
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Static(ref value) => f.debug_tuple("Static").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Option-only attributes
#[derive(Debug, Clone)]
#[expect(clippy::struct_excessive_bools, reason = "independent option switches")]
pub struct OptionSpec {
    prompt: Option<String>,
    confirmation_prompt: bool,
    hide_input: bool,
    is_flag: bool,
    is_bool_flag: bool,
    flag_value: RawValue,
    count: bool,
    allow_from_autoenv: bool,
    hidden: bool,
    show_default: bool,
    help: Option<String>,
}

impl OptionSpec {
    /// Prompt text, if the option prompts
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Whether the option is a flag
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        self.is_flag
    }

    /// Whether the option is a boolean flag
    #[must_use]
    pub const fn is_bool_flag(&self) -> bool {
        self.is_bool_flag
    }

    /// Value stored when the flag is given
    #[must_use]
    pub const fn flag_value(&self) -> &RawValue {
        &self.flag_value
    }

    /// Whether the option counts occurrences
    #[must_use]
    pub const fn is_count(&self) -> bool {
        self.count
    }

    /// Whether the option is left out of help output
    #[must_use]
    pub const fn hidden(&self) -> bool {
        self.hidden
    }

    /// Help text
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

/// Whether a parameter is an option or a positional argument
#[derive(Debug, Clone)]
pub enum ParamKind {
    Option(OptionSpec),
    Argument,
}

/// One declared option or argument
#[derive(Clone)]
pub struct Parameter {
    name: String,
    opts: Vec<String>,
    secondary_opts: Vec<String>,
    kind: ParamKind,
    param_type: TypeRef,
    arity: Arity,
    multiple: bool,
    default: Option<DefaultValue>,
    required: bool,
    envvars: Vec<String>,
    eager: bool,
    expose_value: bool,
    callback: Option<ParamCallback>,
    metavar: Option<String>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("opts", &self.opts)
            .field("secondary_opts", &self.secondary_opts)
            .field("kind", &self.kind)
            .field("type", &self.param_type.name())
            .field("arity", &self.arity)
            .field("multiple", &self.multiple)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("envvars", &self.envvars)
            .field("eager", &self.eager)
            .field("expose_value", &self.expose_value)
            .finish_non_exhaustive()
    }
}

impl Parameter {
    /// Start declaring an option, e.g. `["-n", "--name"]`
    #[must_use]
    pub fn option<I, S>(decls: I) -> OptionBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptionBuilder::new(decls.into_iter().map(Into::into).collect())
    }

    /// Start declaring a positional argument
    #[must_use]
    pub fn argument(decl: &str) -> ArgumentBuilder {
        ArgumentBuilder::new(vec![decl.to_owned()])
    }

    /// Canonical name; the key in [`Context::params`]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary display tokens
    #[must_use]
    pub fn opts(&self) -> &[String] {
        &self.opts
    }

    /// Secondary (off-switch) tokens of a boolean flag
    #[must_use]
    pub fn secondary_opts(&self) -> &[String] {
        &self.secondary_opts
    }

    /// Option or argument
    #[must_use]
    pub const fn kind(&self) -> &ParamKind {
        &self.kind
    }

    /// Option attributes, if this is an option
    #[must_use]
    pub const fn option_spec(&self) -> Option<&OptionSpec> {
        match self.kind {
            ParamKind::Option(ref spec) => Some(spec),
            ParamKind::Argument => None,
        }
    }

    /// Whether this is a positional argument
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self.kind, ParamKind::Argument)
    }

    /// Declared type
    #[must_use]
    pub fn param_type(&self) -> &dyn ParamType {
        self.param_type.as_ref()
    }

    /// Values consumed per occurrence
    #[must_use]
    pub const fn arity(&self) -> Arity {
        self.arity
    }

    /// Whether repeated occurrences are collected
    #[must_use]
    pub const fn multiple(&self) -> bool {
        self.multiple
    }

    /// Whether a value must come from some source
    #[must_use]
    pub const fn required(&self) -> bool {
        self.required
    }

    /// Declared environment variables
    #[must_use]
    pub fn envvars(&self) -> &[String] {
        &self.envvars
    }

    /// Whether the parameter is processed before non-eager ones
    #[must_use]
    pub const fn is_eager(&self) -> bool {
        self.eager
    }

    /// Whether the value is stored on the context
    #[must_use]
    pub const fn expose_value(&self) -> bool {
        self.expose_value
    }

    /// Whether the parameter is left out of help output
    #[must_use]
    pub fn hidden(&self) -> bool {
        self.option_spec().is_some_and(OptionSpec::hidden)
    }

    /// Nesting depth of the value: one level for a tuple arity, one for `multiple`
    fn value_depth(&self) -> usize {
        usize::from(self.arity.is_tuple()) + usize::from(self.multiple)
    }

    /// `"opt" / "opt"` form used in error messages
    #[must_use]
    pub fn error_hint(&self) -> String {
        quote_join(&self.opts)
    }

    /// Metavar shown in usage and help output
    #[must_use]
    pub fn make_metavar(&self) -> String {
        if let Some(metavar) = self.metavar.as_ref() {
            return metavar.clone();
        }

        let mut metavar = match self.kind {
            ParamKind::Argument => {
                let base = self.param_type.metavar(self).unwrap_or_else(|| {
                    self.opts
                        .first()
                        .unwrap_or(&self.name)
                        .to_uppercase()
                });
                if self.required {
                    base
                } else {
                    format!("[{base}]")
                }
            }
            ParamKind::Option(_) => self
                .param_type
                .metavar(self)
                .unwrap_or_else(|| self.param_type.name().to_uppercase()),
        };
        if self.arity != Arity::ONE {
            metavar.push_str("...");
        }
        metavar
    }

    /// Pieces this parameter contributes to the usage line
    #[must_use]
    pub fn usage_pieces(&self) -> Vec<String> {
        match self.kind {
            ParamKind::Argument => vec![self.make_metavar()],
            ParamKind::Option(_) => Vec::new(),
        }
    }

    /// Row of the options table: `(tokens, help)`
    #[must_use]
    pub fn help_record(&self) -> Option<(String, String)> {
        let ParamKind::Option(ref spec) = self.kind else {
            return None;
        };
        if spec.hidden {
            return None;
        }

        let mut any_slash = false;
        let mut write_opts = |opts: &[String]| {
            let (mut text, slashes) = crate::formatting::join_options(opts);
            any_slash |= slashes;
            if !spec.is_flag && !spec.count {
                text.push(' ');
                text.push_str(&self.make_metavar());
            }
            text
        };

        let mut parts = vec![write_opts(&self.opts)];
        if !self.secondary_opts.is_empty() {
            parts.push(write_opts(&self.secondary_opts));
        }

        let mut extra: Vec<String> = Vec::new();
        if spec.show_default
            && let Some(default) = self.default.as_ref()
        {
            let shown = match *default {
                DefaultValue::Static(ref value) => value.to_string(),
                DefaultValue::Producer(_) => "(dynamic)".to_owned(),
            };
            extra.push(format!("default: {shown}"));
        }
        if self.required {
            extra.push("required".to_owned());
        }

        let mut help = spec.help.clone().unwrap_or_default();
        if !extra.is_empty() {
            if !help.is_empty() {
                help.push_str("  ");
            }
            help.push_str(&format!("[{}]", extra.join("; ")));
        }

        let separator = if any_slash { "; " } else { " / " };
        Some((parts.join(separator), help))
    }

    pub(crate) fn add_to_parser(&self, parser: &mut OptionParser, index: usize) -> Result<()> {
        match self.kind {
            ParamKind::Argument => {
                parser.add_argument(&self.name, index, self.arity, !self.envvars.is_empty());
                Ok(())
            }
            ParamKind::Option(ref spec) => {
                let nargs = match self.arity {
                    Arity::Fixed(n) => n,
                    Arity::Variadic => 1,
                };

                if spec.is_flag {
                    let action = |value: RawValue| {
                        if self.multiple {
                            Action::AppendConst(value)
                        } else {
                            Action::StoreConst(value)
                        }
                    };
                    if spec.is_bool_flag && !self.secondary_opts.is_empty() {
                        parser.add_option(&self.opts, &self.name, index, action(true.into()), nargs)?;
                        parser.add_option(
                            &self.secondary_opts,
                            &self.name,
                            index,
                            action(false.into()),
                            nargs,
                        )?;
                    } else {
                        parser.add_option(
                            &self.opts,
                            &self.name,
                            index,
                            action(spec.flag_value.clone()),
                            nargs,
                        )?;
                    }
                    return Ok(());
                }

                let action = if spec.count {
                    Action::Count
                } else if self.multiple {
                    Action::Append
                } else {
                    Action::Store
                };
                parser.add_option(&self.opts, &self.name, index, action, nargs)
            }
        }
    }

    /// The declared default, converted
    ///
    /// Non-boolean flags sharing a name resolve to the flag value of the
    /// sibling whose default is truthy.
    ///
    /// # Errors
    ///
    /// Returns a conversion error if the default does not convert
    pub fn get_default(&self, ctx: &Context<'_>) -> Result<Option<Value>> {
        if let ParamKind::Option(ref spec) = self.kind
            && spec.is_flag
            && !spec.is_bool_flag
        {
            for sibling in ctx.command().params() {
                if sibling.name == self.name
                    && let Some(DefaultValue::Static(ref value)) = sibling.default
                    && value.is_truthy()
                    && let Some(sibling_spec) = sibling.option_spec()
                {
                    return self
                        .type_cast_value(ctx, sibling_spec.flag_value.clone())
                        .map(Some);
                }
            }
            return Ok(None);
        }

        match self.default.as_ref() {
            Some(default) => self.type_cast_value(ctx, default.resolve()).map(Some),
            None => Ok(None),
        }
    }

    fn resolve_envvar_value(&self, ctx: &Context<'_>) -> Option<String> {
        let system = ctx.system();
        if let Some(value) = self
            .envvars
            .iter()
            .find_map(|name| system.env_var(name).ok())
        {
            return Some(value);
        }

        let ParamKind::Option(ref spec) = self.kind else {
            return None;
        };
        if !spec.allow_from_autoenv {
            return None;
        }
        let prefix = ctx.auto_envvar_prefix()?;
        let name = format!("{prefix}_{}", self.name.to_uppercase());
        system.env_var(&name).ok()
    }

    fn value_from_envvar(&self, ctx: &Context<'_>) -> Option<RawValue> {
        let raw = self.resolve_envvar_value(ctx)?;
        if self.value_depth() == 0 {
            return Some(RawValue::Text(raw));
        }

        let parts: Vec<RawValue> = self
            .param_type
            .split_envvar_value(&raw)
            .into_iter()
            .map(RawValue::Text)
            .collect();

        match self.arity {
            Arity::Fixed(n) if self.multiple && n != 1 => {
                let groups = parts
                    .chunks_exact(n)
                    .map(|chunk| RawValue::Tuple(chunk.to_vec()))
                    .collect();
                Some(RawValue::Tuple(groups))
            }
            _ => Some(RawValue::Tuple(parts)),
        }
    }

    fn consume_value(&self, ctx: &Context<'_>, opts: &HashMap<String, RawValue>) -> Option<RawValue> {
        if let Some(value) = opts.get(&self.name) {
            return Some(value.clone());
        }
        if let Some(value) = ctx.lookup_default(&self.name) {
            debug!("Using default map value for {}", self.name);
            return Some(value);
        }
        let value = self.value_from_envvar(ctx);
        if value.is_some() {
            debug!("Using environment value for {}", self.name);
        }
        value
    }

    /// Convert a raw value, recursing once per nesting level
    ///
    /// # Errors
    ///
    /// Returns the type's conversion error
    pub fn type_cast_value(&self, ctx: &Context<'_>, raw: RawValue) -> Result<Value> {
        self.convert_level(ctx, raw, self.value_depth())
    }

    fn convert_level(&self, ctx: &Context<'_>, raw: RawValue, level: usize) -> Result<Value> {
        if level == 0 {
            return self.param_type.convert(&raw, self, ctx);
        }
        let items = match raw {
            RawValue::Tuple(items) => items,
            RawValue::Typed(Value::Tuple(items) | Value::List(items)) => {
                items.into_iter().map(RawValue::Typed).collect()
            }
            scalar => vec![scalar],
        };
        items
            .into_iter()
            .map(|item| self.convert_level(ctx, item, level - 1))
            .collect::<Result<Vec<_>>>()
            .map(Value::Tuple)
    }

    fn process_value(&self, ctx: &Context<'_>, raw: Option<RawValue>) -> Result<Option<Value>> {
        raw.map(|raw| self.type_cast_value(ctx, raw)).transpose()
    }

    fn value_is_missing(&self, value: Option<&Value>) -> bool {
        match value {
            None => true,
            Some(Value::Tuple(items)) => self.value_depth() > 0 && items.is_empty(),
            Some(_) => false,
        }
    }

    fn missing_message(&self) -> String {
        let kind = match self.kind {
            ParamKind::Option(_) => "option",
            ParamKind::Argument => "argument",
        };
        let tokens: Vec<String> = self
            .opts
            .iter()
            .chain(&self.secondary_opts)
            .cloned()
            .collect();
        let mut message = format!("Missing {kind} {}.", quote_join(&tokens));
        if let Some(extra) = self.param_type.missing_message(self) {
            message.push_str("  ");
            message.push_str(&extra);
        }
        message
    }

    fn full_process_value(&self, ctx: &Context<'_>, raw: Option<RawValue>) -> Result<Option<Value>> {
        if raw.is_none()
            && !ctx.resilient_parsing()
            && self.option_spec().and_then(OptionSpec::prompt).is_some()
        {
            return self.prompt_for_value(ctx);
        }

        let mut value = self.process_value(ctx, raw)?;
        if value.is_none() {
            value = self.get_default(ctx)?;
        }
        if value.is_none() && (self.multiple || self.arity == Arity::Variadic) {
            value = Some(Value::Tuple(Vec::new()));
        }

        if self.required && self.value_is_missing(value.as_ref()) {
            return Err(CliError::missing_parameter(self.missing_message()));
        }
        Ok(value)
    }

    fn prompt_for_value(&self, ctx: &Context<'_>) -> Result<Option<Value>> {
        let Some(spec) = self.option_spec() else {
            return Ok(None);
        };
        let Some(text) = spec.prompt.as_deref() else {
            return Ok(None);
        };

        let default = self.get_default(ctx)?;

        if spec.is_bool_flag {
            let default = default.as_ref().and_then(Value::as_bool).unwrap_or(false);
            return termui::confirm(ctx.system(), text, default).map(|answer| Some(Value::Bool(answer)));
        }

        let options = PromptOptions {
            default: default.as_ref().map(ToString::to_string),
            hide_input: spec.hide_input,
            confirmation_prompt: spec.confirmation_prompt,
        };
        let value = termui::prompt(ctx.system(), text, &options, |input| {
            let raw = if self.value_depth() > 0 {
                RawValue::Tuple(
                    self.param_type
                        .split_envvar_value(input)
                        .into_iter()
                        .map(RawValue::Text)
                        .collect(),
                )
            } else {
                RawValue::Text(input.to_owned())
            };
            self.type_cast_value(ctx, raw)
        })?;
        Ok(Some(value))
    }

    /// Resolve this parameter against the tokenizer output
    ///
    /// In resilient mode failures leave the value absent instead of
    /// propagating, except exit requests.
    ///
    /// # Errors
    ///
    /// Returns conversion, missing-parameter and callback errors, attributed
    /// to this parameter and the context
    pub(crate) fn handle_parse_result(
        &self,
        ctx: &mut Context<'_>,
        opts: &HashMap<String, RawValue>,
    ) -> Result<Option<Value>> {
        let attribute = |error: CliError, ctx: &Context<'_>| {
            error
                .with_param_hint(|| self.error_hint())
                .with_usage(|| ctx.usage_info())
        };

        let raw = self.consume_value(ctx, opts);
        let mut value = match self.full_process_value(ctx, raw) {
            Ok(value) => value,
            Err(e) if ctx.resilient_parsing() && !e.is_silent() => {
                warn!("Ignoring error for {} in resilient mode: {e}", self.name);
                None
            }
            Err(e) => return Err(attribute(e, ctx)),
        };

        if let Some(callback) = self.callback.as_ref() {
            value = match callback(ctx, self, value) {
                Ok(value) => value,
                Err(e) if ctx.resilient_parsing() && !e.is_silent() => {
                    warn!("Ignoring callback error for {} in resilient mode: {e}", self.name);
                    None
                }
                Err(e) => return Err(attribute(e, ctx)),
            };
        }

        if self.expose_value {
            ctx.set_param(&self.name, value.clone());
        }
        Ok(value)
    }
}

fn quote_join(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| format!("\"{token}\""))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Prompt text setting of an option
#[derive(Debug, Clone, Default)]
enum PromptSetting {
    #[default]
    Off,
    /// Derive the text from the option name
    Auto,
    Text(String),
}

/// Builder for options
#[must_use]
#[derive(Clone)]
#[expect(clippy::struct_excessive_bools, reason = "builder mirrors option switches")]
pub struct OptionBuilder {
    decls: Vec<String>,
    param_type: Option<TypeRef>,
    required: bool,
    default: Option<DefaultValue>,
    callback: Option<ParamCallback>,
    nargs: usize,
    metavar: Option<String>,
    expose_value: bool,
    envvars: Vec<String>,
    eager: bool,
    prompt: PromptSetting,
    confirmation_prompt: bool,
    hide_input: bool,
    is_flag: Option<bool>,
    flag_value: Option<RawValue>,
    multiple: bool,
    count: bool,
    allow_from_autoenv: bool,
    help: Option<String>,
    hidden: bool,
    show_default: bool,
}

impl OptionBuilder {
    fn new(decls: Vec<String>) -> Self {
        Self {
            decls,
            param_type: None,
            required: false,
            default: None,
            callback: None,
            nargs: 1,
            metavar: None,
            expose_value: true,
            envvars: Vec::new(),
            eager: false,
            prompt: PromptSetting::Off,
            confirmation_prompt: false,
            hide_input: false,
            is_flag: None,
            flag_value: None,
            multiple: false,
            count: false,
            allow_from_autoenv: true,
            help: None,
            hidden: false,
            show_default: false,
        }
    }

    /// Declared type
    pub fn param_type<T: ParamType + 'static>(mut self, param_type: T) -> Self {
        self.param_type = Some(Rc::new(param_type));
        self
    }

    /// Require a value
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Literal default
    pub fn default<V: Into<RawValue>>(mut self, value: V) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Default computed when needed
    pub fn default_fn<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> RawValue + 'static,
    {
        self.default = Some(DefaultValue::Producer(Rc::new(producer)));
        self
    }

    /// Callback run on the resolved value
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Context<'_>, &Parameter, Option<Value>) -> Result<Option<Value>> + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Values consumed per occurrence
    pub const fn nargs(mut self, nargs: usize) -> Self {
        self.nargs = nargs;
        self
    }

    /// Metavar shown in help output
    pub fn metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_owned());
        self
    }

    /// Whether the value is stored on the context
    pub const fn expose_value(mut self, expose: bool) -> Self {
        self.expose_value = expose;
        self
    }

    /// Add an environment variable fallback
    pub fn envvar(mut self, name: &str) -> Self {
        self.envvars.push(name.to_owned());
        self
    }

    /// Process before non-eager parameters
    pub const fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// Prompt with `text` when no value is given
    pub fn prompt(mut self, text: &str) -> Self {
        self.prompt = PromptSetting::Text(text.to_owned());
        self
    }

    /// Prompt with text derived from the option name
    pub fn prompt_auto(mut self) -> Self {
        self.prompt = PromptSetting::Auto;
        self
    }

    /// Ask twice and compare
    pub const fn confirmation_prompt(mut self, confirm: bool) -> Self {
        self.confirmation_prompt = confirm;
        self
    }

    /// Do not echo prompted input
    pub const fn hide_input(mut self, hide: bool) -> Self {
        self.hide_input = hide;
        self
    }

    /// Take no value; store the flag value when present
    pub const fn is_flag(mut self, is_flag: bool) -> Self {
        self.is_flag = Some(is_flag);
        self
    }

    /// Value stored when the flag is given (implies a flag)
    pub fn flag_value<V: Into<RawValue>>(mut self, value: V) -> Self {
        self.flag_value = Some(value.into());
        self
    }

    /// Collect repeated occurrences
    pub const fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Count occurrences
    pub const fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Whether the automatic environment variable applies
    pub const fn allow_from_autoenv(mut self, allow: bool) -> Self {
        self.allow_from_autoenv = allow;
        self
    }

    /// Help text
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_owned());
        self
    }

    /// Leave out of help output
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Show the default in help output
    pub const fn show_default(mut self, show: bool) -> Self {
        self.show_default = show;
        self
    }

    /// Validate the declaration and build the option
    ///
    /// # Errors
    ///
    /// Returns `CliError::Declaration` for contradictory or unnameable
    /// declarations
    pub fn build(self) -> Result<Parameter> {
        let (name, opts, secondary_opts) = parse_option_decls(&self.decls)?;

        if self.nargs == 0 {
            return Err(CliError::declaration(format!(
                "Option {name} must take at least one value"
            )));
        }

        let prompt = match self.prompt {
            PromptSetting::Off => None,
            PromptSetting::Auto => Some(capitalize(&name.replace('_', " "))),
            PromptSetting::Text(text) => Some(text),
        };

        let is_flag = self
            .is_flag
            .unwrap_or(self.flag_value.is_some() || !secondary_opts.is_empty());

        let mut default = self.default;
        if is_flag && default.is_none() {
            default = Some(DefaultValue::Static(false.into()));
        }

        let flag_value = self.flag_value.unwrap_or_else(|| {
            let default_truthy = default
                .as_ref()
                .and_then(DefaultValue::as_static)
                .is_some_and(RawValue::is_truthy);
            RawValue::from(!default_truthy)
        });

        let is_bool_flag = is_flag
            && matches!(flag_value, RawValue::Typed(Value::Bool(_)))
            && self.param_type.as_ref().is_none_or(|t| t.is_bool());

        let param_type: TypeRef = if is_bool_flag {
            Rc::new(BoolType)
        } else if let Some(param_type) = self.param_type {
            param_type
        } else if self.count {
            Rc::new(IntRange::new().min(0))
        } else if is_flag {
            guess_type(Some(&flag_value))
        } else {
            guess_type(default.as_ref().and_then(DefaultValue::as_static))
        };

        if self.count && default.is_none() {
            default = Some(DefaultValue::Static(0_i64.into()));
        }

        if prompt.is_some() && is_flag && !is_bool_flag {
            return Err(CliError::declaration(
                "Cannot prompt for flags that are not bools.",
            ));
        }
        if !is_bool_flag && !secondary_opts.is_empty() {
            return Err(CliError::declaration(
                "Got secondary option for non boolean flag.",
            ));
        }
        if is_bool_flag && self.hide_input && prompt.is_some() {
            return Err(CliError::declaration(
                "Hidden input does not work with boolean flag prompts.",
            ));
        }
        if self.count && self.multiple {
            return Err(CliError::declaration(
                "Options cannot be multiple and count at the same time.",
            ));
        }
        if self.count && is_flag {
            return Err(CliError::declaration(
                "Options cannot be count and flags at the same time.",
            ));
        }

        Ok(Parameter {
            name,
            opts,
            secondary_opts,
            kind: ParamKind::Option(OptionSpec {
                prompt,
                confirmation_prompt: self.confirmation_prompt,
                hide_input: self.hide_input,
                is_flag,
                is_bool_flag,
                flag_value,
                count: self.count,
                allow_from_autoenv: self.allow_from_autoenv,
                hidden: self.hidden,
                show_default: self.show_default,
                help: self.help,
            }),
            param_type,
            arity: Arity::Fixed(self.nargs),
            multiple: self.multiple,
            default,
            required: self.required,
            envvars: self.envvars,
            eager: self.eager,
            expose_value: self.expose_value,
            callback: self.callback,
            metavar: self.metavar,
        })
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split option declarations into name, primary and secondary tokens
fn parse_option_decls(decls: &[String]) -> Result<(String, Vec<String>, Vec<String>)> {
    let mut name: Option<String> = None;
    let mut opts: Vec<String> = Vec::new();
    let mut secondary_opts: Vec<String> = Vec::new();
    let mut possible_names: Vec<(usize, String)> = Vec::new();

    for decl in decls {
        if is_identifier(decl) {
            if name.is_some() {
                return Err(CliError::declaration(format!(
                    "Name defined twice: {decl}"
                )));
            }
            name = Some(decl.clone());
            continue;
        }

        let splitter = if decl.starts_with('/') { ';' } else { '/' };
        let (first, second) = match decl.split_once(splitter) {
            Some((first, second)) => (first.trim_end(), Some(second.trim_start())),
            None => (decl.as_str(), None),
        };

        let (prefix, rest) = split_opt(first);
        if prefix.is_empty() {
            return Err(CliError::declaration(format!(
                "Invalid start character for option ({first})"
            )));
        }
        possible_names.push((prefix.len(), rest.to_owned()));
        opts.push(first.to_owned());

        if let Some(second) = second
            && !second.is_empty()
        {
            secondary_opts.push(second.to_owned());
        }
    }

    let name = match name {
        Some(name) => name,
        None => {
            // Stable sort keeps the first declaration among equal prefixes
            possible_names.sort_by(|a, b| b.0.cmp(&a.0));
            let Some((_, longest)) = possible_names.first() else {
                return Err(CliError::declaration(format!(
                    "Could not determine name for option ({})",
                    decls.join(", ")
                )));
            };
            longest.replace('-', "_").to_lowercase()
        }
    };

    if opts.is_empty() && secondary_opts.is_empty() {
        return Err(CliError::declaration(format!(
            "No options defined but a name was passed ({name})"
        )));
    }

    Ok((name, opts, secondary_opts))
}

/// Builder for positional arguments
#[must_use]
#[derive(Clone)]
pub struct ArgumentBuilder {
    decls: Vec<String>,
    param_type: Option<TypeRef>,
    required: Option<bool>,
    default: Option<DefaultValue>,
    callback: Option<ParamCallback>,
    arity: Arity,
    metavar: Option<String>,
    expose_value: bool,
    envvars: Vec<String>,
    eager: bool,
}

impl ArgumentBuilder {
    fn new(decls: Vec<String>) -> Self {
        Self {
            decls,
            param_type: None,
            required: None,
            default: None,
            callback: None,
            arity: Arity::ONE,
            metavar: None,
            expose_value: true,
            envvars: Vec::new(),
            eager: false,
        }
    }

    /// Store under `name` while showing the original declaration
    pub fn dest(mut self, name: &str) -> Self {
        self.decls.insert(0, name.to_owned());
        self
    }

    /// Declared type
    pub fn param_type<T: ParamType + 'static>(mut self, param_type: T) -> Self {
        self.param_type = Some(Rc::new(param_type));
        self
    }

    /// Override whether a value is required
    pub const fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Literal default
    pub fn default<V: Into<RawValue>>(mut self, value: V) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Default computed when needed
    pub fn default_fn<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> RawValue + 'static,
    {
        self.default = Some(DefaultValue::Producer(Rc::new(producer)));
        self
    }

    /// Callback run on the resolved value
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Context<'_>, &Parameter, Option<Value>) -> Result<Option<Value>> + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Consume exactly `nargs` values
    pub const fn nargs(mut self, nargs: usize) -> Self {
        self.arity = Arity::Fixed(nargs);
        self
    }

    /// Consume every remaining positional
    pub const fn variadic(mut self) -> Self {
        self.arity = Arity::Variadic;
        self
    }

    /// Metavar shown in usage output
    pub fn metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_owned());
        self
    }

    /// Whether the value is stored on the context
    pub const fn expose_value(mut self, expose: bool) -> Self {
        self.expose_value = expose;
        self
    }

    /// Add an environment variable fallback
    pub fn envvar(mut self, name: &str) -> Self {
        self.envvars.push(name.to_owned());
        self
    }

    /// Process before non-eager parameters
    pub const fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// Validate the declaration and build the argument
    ///
    /// # Errors
    ///
    /// Returns `CliError::Declaration` unless there are one or two
    /// declarations and a positive arity
    pub fn build(self) -> Result<Parameter> {
        let (name, display) = match self.decls.as_slice() {
            [decl] => (decl.replace('-', "_").to_lowercase(), decl.clone()),
            [name, display] => (name.clone(), display.clone()),
            other => {
                return Err(CliError::declaration(format!(
                    "Arguments take exactly one or two parameter declarations, got {}",
                    other.len()
                )));
            }
        };

        if self.arity == Arity::Fixed(0) {
            return Err(CliError::declaration(format!(
                "Argument {name} must take at least one value"
            )));
        }

        let required = self
            .required
            .unwrap_or(self.default.is_none() && self.arity != Arity::Variadic);

        let param_type = self.param_type.unwrap_or_else(|| {
            guess_type(self.default.as_ref().and_then(DefaultValue::as_static))
        });

        Ok(Parameter {
            name,
            opts: vec![display],
            secondary_opts: Vec::new(),
            kind: ParamKind::Argument,
            param_type,
            arity: self.arity,
            multiple: false,
            default: self.default,
            required,
            envvars: self.envvars,
            eager: self.eager,
            expose_value: self.expose_value,
            callback: self.callback,
            metavar: self.metavar,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_name_from_longest_declaration() {
        let (name, opts, secondary) = parse_option_decls(&names(&["-n", "--dry-run"])).unwrap();
        assert_eq!(name, "dry_run");
        assert_eq!(opts, names(&["-n", "--dry-run"]));
        assert!(secondary.is_empty());
    }

    #[test]
    fn test_explicit_name_and_secondary() {
        let (name, opts, secondary) =
            parse_option_decls(&names(&["--shout/--no-shout", "loud"])).unwrap();
        assert_eq!(name, "loud");
        assert_eq!(opts, names(&["--shout"]));
        assert_eq!(secondary, names(&["--no-shout"]));
    }

    #[test]
    fn test_slash_prefix_uses_semicolon() {
        let (name, opts, secondary) = parse_option_decls(&names(&["/debug;/no-debug"])).unwrap();
        assert_eq!(name, "debug");
        assert_eq!(opts, names(&["/debug"]));
        assert_eq!(secondary, names(&["/no-debug"]));
    }

    #[test]
    fn test_bare_name_without_options_is_rejected() {
        assert!(parse_option_decls(&names(&["name"])).is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("user name"), "User name");
        assert_eq!(capitalize(""), "");
    }
}
