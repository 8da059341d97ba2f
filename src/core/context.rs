//! Per-invocation state
//!
//! A [`Context`] is created for every command that processes arguments. It
//! holds the resolved parameter values, the leftover tokens, the user object
//! and the cleanup registry, and links to the context of the parent command.
//! Settings inherited from the parent are resolved once, when the context is
//! created.

use crate::config::DefaultMap;
use crate::core::command::Command;
use crate::core::value::{RawValue, Value};
use crate::error::{CliError, Result, UsageInfo};
use crate::parser::{TokenNormalizer, split_opt};
use crate::system::System;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Decides whether an unresolvable command name looks like an option
pub type OptionDetector = Rc<dyn Fn(&str) -> bool>;

/// Settings applied when a context is created
///
/// Unset fields fall back to the parent context (for inherited settings) or
/// to the command's own defaults.
#[derive(Clone, Default)]
pub struct ContextSettings {
    obj: Option<Rc<dyn Any>>,
    auto_envvar_prefix: Option<String>,
    default_map: Option<DefaultMap>,
    resilient_parsing: Option<bool>,
    allow_extra_args: Option<bool>,
    allow_interspersed_args: Option<bool>,
    ignore_unknown_options: Option<bool>,
    help_option_names: Option<Vec<String>>,
    token_normalize: Option<TokenNormalizer>,
    option_detector: Option<OptionDetector>,
    color: Option<bool>,
}

impl ContextSettings {
    /// Empty settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user object
    #[must_use]
    pub fn obj<T: Any>(mut self, obj: T) -> Self {
        self.obj = Some(Rc::new(obj));
        self
    }

    /// Set an already shared user object
    #[must_use]
    pub fn obj_rc(mut self, obj: Rc<dyn Any>) -> Self {
        self.obj = Some(obj);
        self
    }

    /// Prefix for automatic environment variables (`PREFIX_PARAM`)
    #[must_use]
    pub fn auto_envvar_prefix(mut self, prefix: &str) -> Self {
        self.auto_envvar_prefix = Some(prefix.to_owned());
        self
    }

    /// Defaults consulted after the command line
    #[must_use]
    pub fn default_map(mut self, map: DefaultMap) -> Self {
        self.default_map = Some(map);
        self
    }

    /// Never prompt and never fail on missing or invalid values
    #[must_use]
    pub const fn resilient_parsing(mut self, resilient: bool) -> Self {
        self.resilient_parsing = Some(resilient);
        self
    }

    /// Keep unconsumed tokens instead of failing
    #[must_use]
    pub const fn allow_extra_args(mut self, allow: bool) -> Self {
        self.allow_extra_args = Some(allow);
        self
    }

    /// Allow options after positionals
    #[must_use]
    pub const fn allow_interspersed_args(mut self, allow: bool) -> Self {
        self.allow_interspersed_args = Some(allow);
        self
    }

    /// Keep unknown options as leftover tokens
    #[must_use]
    pub const fn ignore_unknown_options(mut self, ignore: bool) -> Self {
        self.ignore_unknown_options = Some(ignore);
        self
    }

    /// Option names of the automatic help option
    #[must_use]
    pub fn help_option_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.help_option_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Normalize option names, choices and command names
    #[must_use]
    pub fn token_normalize<F>(mut self, normalize: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.token_normalize = Some(Rc::new(normalize));
        self
    }

    /// Rule deciding whether an unknown command name looks like an option
    #[must_use]
    pub fn option_detector<F>(mut self, detector: F) -> Self
    where
        F: Fn(&str) -> bool + 'static,
    {
        self.option_detector = Some(Rc::new(detector));
        self
    }

    /// Force styled output on or off
    #[must_use]
    pub const fn color(mut self, color: bool) -> Self {
        self.color = Some(color);
        self
    }

    /// These settings with every field set in `over` replaced
    #[must_use]
    pub fn overlay(&self, over: Self) -> Self {
        Self {
            obj: over.obj.or_else(|| self.obj.clone()),
            auto_envvar_prefix: over
                .auto_envvar_prefix
                .or_else(|| self.auto_envvar_prefix.clone()),
            default_map: over.default_map.or_else(|| self.default_map.clone()),
            resilient_parsing: over.resilient_parsing.or(self.resilient_parsing),
            allow_extra_args: over.allow_extra_args.or(self.allow_extra_args),
            allow_interspersed_args: over
                .allow_interspersed_args
                .or(self.allow_interspersed_args),
            ignore_unknown_options: over
                .ignore_unknown_options
                .or(self.ignore_unknown_options),
            help_option_names: over
                .help_option_names
                .or_else(|| self.help_option_names.clone()),
            token_normalize: over
                .token_normalize
                .or_else(|| self.token_normalize.clone()),
            option_detector: over
                .option_detector
                .or_else(|| self.option_detector.clone()),
            color: over.color.or(self.color),
        }
    }
}

impl fmt::Debug for ContextSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSettings")
            .field("auto_envvar_prefix", &self.auto_envvar_prefix)
            .field("default_map", &self.default_map)
            .field("resilient_parsing", &self.resilient_parsing)
            .field("allow_extra_args", &self.allow_extra_args)
            .field("allow_interspersed_args", &self.allow_interspersed_args)
            .field("ignore_unknown_options", &self.ignore_unknown_options)
            .field("help_option_names", &self.help_option_names)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// State of one command invocation
pub struct Context<'a> {
    command: &'a Command,
    parent: Option<&'a Context<'a>>,
    system: &'a dyn System,
    info_name: Option<String>,
    params: HashMap<String, Option<Value>>,
    args: Vec<String>,
    protected_args: Vec<String>,
    obj: RefCell<Option<Rc<dyn Any>>>,
    default_map: Option<DefaultMap>,
    invoked_subcommand: RefCell<Option<String>>,
    auto_envvar_prefix: Option<String>,
    resilient_parsing: bool,
    allow_extra_args: bool,
    allow_interspersed_args: bool,
    ignore_unknown_options: bool,
    help_option_names: Vec<String>,
    token_normalize: Option<TokenNormalizer>,
    option_detector: OptionDetector,
    color: Option<bool>,
    close_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    depth: Cell<usize>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        command: &'a Command,
        parent: Option<&'a Context<'a>>,
        system: &'a dyn System,
        info_name: Option<String>,
        settings: ContextSettings,
    ) -> Self {
        let obj = settings
            .obj
            .or_else(|| parent.and_then(|p| p.obj.borrow().clone()));

        let default_map = settings.default_map.or_else(|| {
            let parent = parent?;
            let name = info_name.as_deref()?;
            parent.default_map.as_ref()?.nested(name).cloned()
        });

        let auto_envvar_prefix = match settings.auto_envvar_prefix {
            Some(prefix) => Some(prefix.to_uppercase()),
            None => parent.and_then(|p| {
                let prefix = p.auto_envvar_prefix.as_ref()?;
                let name = info_name.as_ref()?;
                Some(format!("{prefix}_{}", name.replace('-', "_").to_uppercase()))
            }),
        };

        let resilient_parsing = settings
            .resilient_parsing
            .unwrap_or_else(|| parent.is_some_and(|p| p.resilient_parsing));

        let help_option_names = settings
            .help_option_names
            .or_else(|| parent.map(|p| p.help_option_names.clone()))
            .unwrap_or_else(|| vec!["--help".to_owned()]);

        let token_normalize = settings
            .token_normalize
            .or_else(|| parent.and_then(|p| p.token_normalize.clone()));

        let option_detector = settings
            .option_detector
            .or_else(|| parent.map(|p| Rc::clone(&p.option_detector)))
            .unwrap_or_else(|| Rc::new(|token: &str| !split_opt(token).0.is_empty()));

        let color = settings.color.or_else(|| parent.and_then(|p| p.color));

        Self {
            command,
            parent,
            system,
            info_name,
            params: HashMap::new(),
            args: Vec::new(),
            protected_args: Vec::new(),
            obj: RefCell::new(obj),
            default_map,
            invoked_subcommand: RefCell::new(None),
            auto_envvar_prefix,
            resilient_parsing,
            allow_extra_args: settings
                .allow_extra_args
                .unwrap_or_else(|| command.allows_extra_args()),
            allow_interspersed_args: settings
                .allow_interspersed_args
                .unwrap_or_else(|| command.allows_interspersed_args()),
            ignore_unknown_options: settings
                .ignore_unknown_options
                .unwrap_or_else(|| command.ignores_unknown_options()),
            help_option_names,
            token_normalize,
            option_detector,
            color,
            close_callbacks: RefCell::new(Vec::new()),
            depth: Cell::new(0),
        }
    }

    /// A fresh context for the same command, parent and settings
    ///
    /// Used to re-run argument parsing without touching this context.
    pub(crate) fn probe(&self) -> Self {
        Self {
            command: self.command,
            parent: self.parent,
            system: self.system,
            info_name: self.info_name.clone(),
            params: HashMap::new(),
            args: Vec::new(),
            protected_args: Vec::new(),
            obj: RefCell::new(self.obj.borrow().clone()),
            default_map: self.default_map.clone(),
            invoked_subcommand: RefCell::new(None),
            auto_envvar_prefix: self.auto_envvar_prefix.clone(),
            resilient_parsing: self.resilient_parsing,
            allow_extra_args: self.allow_extra_args,
            allow_interspersed_args: self.allow_interspersed_args,
            ignore_unknown_options: self.ignore_unknown_options,
            help_option_names: self.help_option_names.clone(),
            token_normalize: self.token_normalize.clone(),
            option_detector: Rc::clone(&self.option_detector),
            color: self.color,
            close_callbacks: RefCell::new(Vec::new()),
            depth: Cell::new(0),
        }
    }

    /// The command this context belongs to
    #[must_use]
    pub const fn command(&self) -> &'a Command {
        self.command
    }

    /// The parent context, if any
    #[must_use]
    pub const fn parent(&self) -> Option<&'a Context<'a>> {
        self.parent
    }

    /// System used for environment, terminal and file access
    #[must_use]
    pub fn system(&self) -> &'a dyn System {
        self.system
    }

    /// The name the command was invoked as
    #[must_use]
    pub fn info_name(&self) -> Option<&str> {
        self.info_name.as_deref()
    }

    /// Resolved values of exposed parameters; `None` means absent
    #[must_use]
    pub const fn params(&self) -> &HashMap<String, Option<Value>> {
        &self.params
    }

    /// The resolved value of one parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).and_then(Option::as_ref)
    }

    /// Tokens left after parsing
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Tokens reserved for subcommand dispatch
    #[must_use]
    pub fn protected_args(&self) -> &[String] {
        &self.protected_args
    }

    /// Name of the subcommand about to run, `*` in chain mode
    #[must_use]
    pub fn invoked_subcommand(&self) -> Option<String> {
        self.invoked_subcommand.borrow().clone()
    }

    /// The default map narrowed to this command
    #[must_use]
    pub const fn default_map(&self) -> Option<&DefaultMap> {
        self.default_map.as_ref()
    }

    /// Upper-cased prefix for automatic environment variables
    #[must_use]
    pub fn auto_envvar_prefix(&self) -> Option<&str> {
        self.auto_envvar_prefix.as_deref()
    }

    /// Whether prompts and hard failures are suppressed
    #[must_use]
    pub const fn resilient_parsing(&self) -> bool {
        self.resilient_parsing
    }

    /// Whether unconsumed tokens are kept instead of failing
    #[must_use]
    pub const fn allow_extra_args(&self) -> bool {
        self.allow_extra_args
    }

    /// Whether options may follow positionals
    #[must_use]
    pub const fn allow_interspersed_args(&self) -> bool {
        self.allow_interspersed_args
    }

    /// Whether unknown options are kept as leftovers
    #[must_use]
    pub const fn ignore_unknown_options(&self) -> bool {
        self.ignore_unknown_options
    }

    /// Option names of the automatic help option
    #[must_use]
    pub fn help_option_names(&self) -> &[String] {
        &self.help_option_names
    }

    /// Token normalizer, if configured
    #[must_use]
    pub fn token_normalize(&self) -> Option<&TokenNormalizer> {
        self.token_normalize.as_ref()
    }

    /// Whether `token` looks like an option to this context
    #[must_use]
    pub fn looks_like_option(&self, token: &str) -> bool {
        (self.option_detector)(token)
    }

    /// Styled output preference
    #[must_use]
    pub const fn color(&self) -> Option<bool> {
        self.color
    }

    /// The user object of this context
    #[must_use]
    pub fn obj(&self) -> Option<Rc<dyn Any>> {
        self.obj.borrow().clone()
    }

    /// Replace the user object of this context
    pub fn set_obj(&self, obj: Rc<dyn Any>) {
        *self.obj.borrow_mut() = Some(obj);
    }

    /// The closest user object of type `T`, searching up to the root
    #[must_use]
    pub fn find_object<T: Any>(&self) -> Option<Rc<T>> {
        let mut node = Some(self);
        while let Some(ctx) = node {
            if let Some(obj) = ctx.obj.borrow().as_ref()
                && let Ok(found) = Rc::clone(obj).downcast::<T>()
            {
                return Some(found);
            }
            node = ctx.parent;
        }
        None
    }

    /// Like [`Self::find_object`], creating a default object here if none exists
    pub fn ensure_object<T: Any + Default>(&self) -> Rc<T> {
        if let Some(found) = self.find_object::<T>() {
            return found;
        }
        let created = Rc::new(T::default());
        self.set_obj(Rc::clone(&created) as Rc<dyn Any>);
        created
    }

    /// The default-map entry for a parameter, calling producers
    #[must_use]
    pub fn lookup_default(&self, name: &str) -> Option<RawValue> {
        self.default_map.as_ref()?.lookup(name)
    }

    /// Space-separated invocation names from the root to this context
    #[must_use]
    pub fn command_path(&self) -> String {
        let own = self.info_name.as_deref().unwrap_or_default();
        match self.parent {
            Some(parent) => format!("{} {own}", parent.command_path())
                .trim_start()
                .to_owned(),
            None => own.to_owned(),
        }
    }

    /// The outermost context
    #[must_use]
    pub fn find_root(&self) -> &Self {
        let mut node = self;
        while let Some(parent) = node.parent {
            node = parent;
        }
        node
    }

    /// A usage error attributed to this context
    #[must_use]
    pub fn fail<S: Into<String>>(&self, message: S) -> CliError {
        CliError::usage(message).with_usage(|| self.usage_info())
    }

    /// An abort signal
    #[must_use]
    pub const fn abort(&self) -> CliError {
        CliError::Abort
    }

    /// An early-exit signal with `code`
    #[must_use]
    pub const fn exit(&self, code: i32) -> CliError {
        CliError::Exit { code }
    }

    /// Register a function to run when this context closes
    pub fn call_on_close<F: FnOnce() + 'static>(&self, callback: F) {
        self.close_callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Run and discard every registered close callback, in registration order
    pub fn close(&self) {
        let callbacks = std::mem::take(&mut *self.close_callbacks.borrow_mut());
        if !callbacks.is_empty() {
            debug!(
                "Closing context {} ({} callbacks)",
                self.command_path(),
                callbacks.len()
            );
        }
        for callback in callbacks {
            callback();
        }
    }

    /// Enter this context; cleanup runs when the outermost scope ends
    #[must_use = "the context closes as soon as the scope guard is dropped"]
    pub fn scope(&self) -> ContextScope<'_, 'a> {
        self.depth.set(self.depth.get() + 1);
        ContextScope { ctx: self }
    }

    /// Rendered usage line of the command
    #[must_use]
    pub fn get_usage(&self) -> String {
        self.command.get_usage(self)
    }

    /// Rendered help page of the command
    #[must_use]
    pub fn get_help(&self) -> String {
        self.command.get_help(self)
    }

    /// Usage snapshot attached to errors raised in this context
    #[must_use]
    pub fn usage_info(&self) -> UsageInfo {
        let help_hint = match self.help_option_names.first() {
            Some(name) if self.command.has_help_option(self) => Some(format!(
                "Try \"{} {name}\" for help.",
                self.command_path()
            )),
            _ => None,
        };
        UsageInfo {
            usage: self.get_usage(),
            help_hint,
        }
    }

    /// Call another command's callback in a fresh child context
    ///
    /// Exposed parameters missing from `values` get their defaults.
    ///
    /// # Errors
    ///
    /// Returns whatever the callback or a default conversion fails with
    pub fn invoke_command<I, S>(&self, command: &Command, values: I) -> Result<Value>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(name, value)| (name.into(), Some(value)))
            .collect();
        self.invoke_with(command, values)
    }

    /// Like [`Self::invoke_command`], also passing this context's values
    ///
    /// # Errors
    ///
    /// Returns whatever the callback or a default conversion fails with
    pub fn forward<I, S>(&self, command: &Command, extra: I) -> Result<Value>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut values = self.params.clone();
        for (name, value) in extra {
            values.insert(name.into(), Some(value));
        }
        self.invoke_with(command, values)
    }

    fn invoke_with(
        &self,
        command: &Command,
        mut values: HashMap<String, Option<Value>>,
    ) -> Result<Value> {
        let mut child = Context::new(
            command,
            Some(self),
            self.system,
            Some(command.name().to_owned()),
            ContextSettings::default(),
        );

        for param in command.params() {
            if param.expose_value() && !values.contains_key(param.name()) {
                let default = param
                    .get_default(&child)
                    .map_err(|e| e.with_usage(|| self.usage_info()))?;
                values.insert(param.name().to_owned(), default);
            }
        }
        child.params = values;

        let _scope = child.scope();
        command
            .invoke_callback(&child)
            .map_err(|e| e.with_usage(|| self.usage_info()))
    }

    pub(crate) fn set_param(&mut self, name: &str, value: Option<Value>) {
        self.params.insert(name.to_owned(), value);
    }

    pub(crate) fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    pub(crate) fn set_protected_args(&mut self, args: Vec<String>) {
        self.protected_args = args;
    }

    pub(crate) fn take_args(&mut self) -> Vec<String> {
        std::mem::take(&mut self.args)
    }

    pub(crate) fn set_invoked_subcommand(&self, name: Option<String>) {
        *self.invoked_subcommand.borrow_mut() = name;
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("command", &self.command.name())
            .field("info_name", &self.info_name)
            .field("params", &self.params)
            .field("args", &self.args)
            .field("protected_args", &self.protected_args)
            .field("invoked_subcommand", &self.invoked_subcommand.borrow())
            .field("resilient_parsing", &self.resilient_parsing)
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`Context::scope`]
pub struct ContextScope<'c, 'a> {
    ctx: &'c Context<'a>,
}

impl Drop for ContextScope<'_, '_> {
    fn drop(&mut self) {
        let depth = self.ctx.depth.get().saturating_sub(1);
        self.ctx.depth.set(depth);
        if depth == 0 {
            self.ctx.close();
        }
    }
}
