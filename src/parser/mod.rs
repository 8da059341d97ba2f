//! Command-line tokenizer
//!
//! Splits a token list into raw option values, leftover positionals and the
//! order in which parameters were first seen. The parser knows nothing about
//! types: every value it produces is text (or a constant carried by a flag).

use crate::core::value::{RawValue, Value};
use crate::error::{CliError, Result};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use tracing::trace;

/// Transform applied to option names, choices and command names
pub type TokenNormalizer = Rc<dyn Fn(&str) -> String>;

/// Number of raw values a parameter consumes per occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` values; `Fixed(1)` is a scalar
    Fixed(usize),
    /// Every remaining positional (`nargs = -1`)
    Variadic,
}

impl Arity {
    /// A single scalar value
    pub const ONE: Self = Self::Fixed(1);

    /// Whether a value of this arity is a tuple
    #[must_use]
    #[inline]
    pub const fn is_tuple(self) -> bool {
        !matches!(self, Self::Fixed(1))
    }
}

/// What an option does when it is matched
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Store,
    StoreConst(RawValue),
    Append,
    AppendConst(RawValue),
    Count,
}

impl Action {
    const fn takes_value(&self) -> bool {
        matches!(*self, Self::Store | Self::Append)
    }
}

/// Split a token into its option prefix and the remainder
///
/// The prefix is the first character when it is not alphanumeric, doubled
/// when the second character repeats it (`--name` → `("--", "name")`).
#[must_use]
pub fn split_opt(opt: &str) -> (&str, &str) {
    let mut chars = opt.chars();
    let Some(first) = chars.next() else {
        return ("", opt);
    };
    if first.is_alphanumeric() {
        return ("", opt);
    }
    let first_len = first.len_utf8();
    if chars.next() == Some(first) {
        return opt.split_at(first_len * 2);
    }
    opt.split_at(first_len)
}

/// Apply the token normalizer to the name part of an option
#[must_use]
pub fn normalize_opt(opt: &str, normalize: Option<&TokenNormalizer>) -> String {
    let Some(normalize) = normalize else {
        return opt.to_owned();
    };
    let (prefix, name) = split_opt(opt);
    format!("{prefix}{}", normalize(name))
}

fn first_chars(token: &str, count: usize) -> &str {
    let end = token
        .char_indices()
        .nth(count)
        .map_or(token.len(), |(index, _)| index);
    &token[..end]
}

#[derive(Debug)]
struct ParserOption {
    dest: String,
    param_index: usize,
    action: Action,
    nargs: usize,
}

#[derive(Debug)]
struct ParserArgument {
    dest: String,
    param_index: usize,
    arity: Arity,
    has_envvar: bool,
}

/// Result of tokenizing one command's arguments
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Raw value per parameter name
    pub opts: HashMap<String, RawValue>,
    /// Tokens nothing consumed
    pub args: Vec<String>,
    /// Parameter indices in the order they were first encountered
    pub order: Vec<usize>,
}

#[derive(Debug, Default)]
struct ParsingState {
    opts: HashMap<String, RawValue>,
    largs: Vec<String>,
    rargs: VecDeque<String>,
    order: Vec<usize>,
}

impl ParsingState {
    fn into_outcome(self) -> ParseOutcome {
        let mut args = self.largs;
        args.extend(self.rargs);
        ParseOutcome {
            opts: self.opts,
            args,
            order: self.order,
        }
    }
}

enum ParseError {
    NoSuchOption {
        opt: String,
        possibilities: Vec<String>,
    },
    Usage(String),
}

impl From<ParseError> for CliError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::NoSuchOption { opt, possibilities } => {
                let mut message = format!("no such option: {opt}");
                match possibilities.as_slice() {
                    [] => {}
                    [only] => message.push_str(&format!("  Did you mean {only}?")),
                    many => message.push_str(&format!(
                        "  (Possible options: {})",
                        many.join(", ")
                    )),
                }
                Self::usage(message)
            }
            ParseError::Usage(message) => Self::usage(message),
        }
    }
}

type ParseStep = std::result::Result<(), ParseError>;

/// Tokenizer configured with one command's option and argument shapes
pub struct OptionParser {
    allow_interspersed_args: bool,
    ignore_unknown_options: bool,
    normalize: Option<TokenNormalizer>,
    opt_prefixes: BTreeSet<String>,
    short_opt: HashMap<String, usize>,
    long_opt: HashMap<String, usize>,
    options: Vec<ParserOption>,
    arguments: Vec<ParserArgument>,
}

impl OptionParser {
    /// Create a parser with the default `-` and `--` prefixes
    #[must_use]
    pub fn new(
        allow_interspersed_args: bool,
        ignore_unknown_options: bool,
        normalize: Option<TokenNormalizer>,
    ) -> Self {
        Self {
            allow_interspersed_args,
            ignore_unknown_options,
            normalize,
            opt_prefixes: BTreeSet::from(["-".to_owned(), "--".to_owned()]),
            short_opt: HashMap::new(),
            long_opt: HashMap::new(),
            options: Vec::new(),
            arguments: Vec::new(),
        }
    }

    /// Register an option under every given token
    ///
    /// # Errors
    ///
    /// Returns a declaration error if a token has no option prefix
    pub fn add_option(
        &mut self,
        opts: &[String],
        dest: &str,
        param_index: usize,
        action: Action,
        nargs: usize,
    ) -> Result<()> {
        let index = self.options.len();
        for opt in opts {
            let opt = normalize_opt(opt, self.normalize.as_ref());
            let (prefix, value) = split_opt(&opt);
            if prefix.is_empty() {
                return Err(CliError::declaration(format!(
                    "Invalid start character for option ({opt})"
                )));
            }
            self.opt_prefixes.insert(first_chars(prefix, 1).to_owned());
            if prefix.chars().count() == 1 && value.chars().count() == 1 {
                self.short_opt.insert(opt.clone(), index);
            } else {
                self.opt_prefixes.insert(prefix.to_owned());
                self.long_opt.insert(opt.clone(), index);
            }
        }
        self.options.push(ParserOption {
            dest: dest.to_owned(),
            param_index,
            action,
            nargs,
        });
        Ok(())
    }

    /// Register a positional argument
    pub fn add_argument(&mut self, dest: &str, param_index: usize, arity: Arity, has_envvar: bool) {
        self.arguments.push(ParserArgument {
            dest: dest.to_owned(),
            param_index,
            arity,
            has_envvar,
        });
    }

    /// Tokenize `args`
    ///
    /// In resilient mode a failure stops parsing and returns whatever was
    /// collected so far instead of an error.
    ///
    /// # Errors
    ///
    /// Returns a usage error for unknown options, missing option values and
    /// partially filled positional tuples
    pub fn parse_args(&self, args: Vec<String>, resilient: bool) -> Result<ParseOutcome> {
        let mut state = ParsingState {
            rargs: args.into(),
            ..ParsingState::default()
        };

        let result = self
            .process_args_for_options(&mut state)
            .and_then(|()| self.process_args_for_args(&mut state));

        match result {
            Ok(()) => Ok(state.into_outcome()),
            Err(e) if resilient => {
                let error = CliError::from(e);
                trace!("Ignoring parse error in resilient mode: {error}");
                Ok(state.into_outcome())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn process_args_for_options(&self, state: &mut ParsingState) -> ParseStep {
        while let Some(arg) = state.rargs.pop_front() {
            if arg == "--" {
                return Ok(());
            }

            let looks_like_option = arg.chars().count() > 1
                && self.opt_prefixes.contains(first_chars(&arg, 1));

            if looks_like_option {
                self.process_opts(&arg, state)?;
            } else if self.allow_interspersed_args {
                state.largs.push(arg);
            } else {
                state.rargs.push_front(arg);
                return Ok(());
            }
        }
        Ok(())
    }

    fn process_opts(&self, arg: &str, state: &mut ParsingState) -> ParseStep {
        let (long_opt, explicit_value) = match arg.split_once('=') {
            Some((opt, value)) => (opt, Some(value)),
            None => (arg, None),
        };
        let norm_long_opt = normalize_opt(long_opt, self.normalize.as_ref());

        match self.match_long_opt(&norm_long_opt, explicit_value, state) {
            Err(ParseError::NoSuchOption { .. })
                if !self.opt_prefixes.contains(first_chars(arg, 2)) =>
            {
                self.match_short_opt(arg, state)
            }
            Err(ParseError::NoSuchOption { .. }) if self.ignore_unknown_options => {
                state.largs.push(arg.to_owned());
                Ok(())
            }
            other => other,
        }
    }

    fn match_long_opt(
        &self,
        opt: &str,
        explicit_value: Option<&str>,
        state: &mut ParsingState,
    ) -> ParseStep {
        let Some(&index) = self.long_opt.get(opt) else {
            let mut possibilities: Vec<String> = self
                .long_opt
                .keys()
                .filter(|word| word.starts_with(opt))
                .cloned()
                .collect();
            possibilities.sort();
            return Err(ParseError::NoSuchOption {
                opt: opt.to_owned(),
                possibilities,
            });
        };

        let option = &self.options[index];
        trace!("Matched long option {opt} for {}", option.dest);

        if option.action.takes_value() {
            if let Some(value) = explicit_value {
                state.rargs.push_front(value.to_owned());
            }
            let value = Self::take_values(option, opt, state)?;
            Self::process(option, Some(value), state);
        } else if explicit_value.is_some() {
            return Err(ParseError::Usage(format!(
                "{opt} option does not take a value"
            )));
        } else {
            Self::process(option, None, state);
        }
        Ok(())
    }

    fn match_short_opt(&self, arg: &str, state: &mut ParsingState) -> ParseStep {
        let prefix = first_chars(arg, 1);
        let rest = &arg[prefix.len()..];
        let mut unknown_options = String::new();

        for (offset, ch) in rest.char_indices() {
            let opt = normalize_opt(&format!("{prefix}{ch}"), self.normalize.as_ref());
            let Some(&index) = self.short_opt.get(&opt) else {
                if self.ignore_unknown_options {
                    unknown_options.push(ch);
                    continue;
                }
                return Err(ParseError::NoSuchOption {
                    opt,
                    possibilities: Vec::new(),
                });
            };

            let option = &self.options[index];
            trace!("Matched short option {opt} for {}", option.dest);

            if option.action.takes_value() {
                let attached = &rest[offset + ch.len_utf8()..];
                if !attached.is_empty() {
                    state.rargs.push_front(attached.to_owned());
                }
                let value = Self::take_values(option, &opt, state)?;
                Self::process(option, Some(value), state);
                break;
            }
            Self::process(option, None, state);
        }

        if self.ignore_unknown_options && !unknown_options.is_empty() {
            state.largs.push(format!("{prefix}{unknown_options}"));
        }
        Ok(())
    }

    fn take_values(
        option: &ParserOption,
        opt: &str,
        state: &mut ParsingState,
    ) -> std::result::Result<RawValue, ParseError> {
        let nargs = option.nargs;
        if state.rargs.len() < nargs {
            return Err(ParseError::Usage(if nargs == 1 {
                format!("{opt} option requires an argument")
            } else {
                format!("{opt} option requires {nargs} arguments")
            }));
        }

        let mut values: Vec<RawValue> = state.rargs.drain(..nargs).map(RawValue::Text).collect();
        if nargs == 1
            && let Some(value) = values.pop()
        {
            return Ok(value);
        }
        Ok(RawValue::Tuple(values))
    }

    fn process(option: &ParserOption, value: Option<RawValue>, state: &mut ParsingState) {
        let dest = option.dest.clone();
        match option.action {
            Action::Store => {
                if let Some(value) = value {
                    state.opts.insert(dest, value);
                }
            }
            Action::StoreConst(ref constant) => {
                state.opts.insert(dest, constant.clone());
            }
            Action::Append => {
                if let Some(value) = value {
                    Self::append(state, dest, value);
                }
            }
            Action::AppendConst(ref constant) => Self::append(state, dest, constant.clone()),
            Action::Count => {
                let current = match state.opts.get(&dest) {
                    Some(RawValue::Typed(Value::Int(n))) => *n,
                    _ => 0,
                };
                state.opts.insert(dest, RawValue::from(current + 1));
            }
        }
        state.order.push(option.param_index);
    }

    fn append(state: &mut ParsingState, dest: String, value: RawValue) {
        match state.opts.entry(dest).or_insert_with(|| RawValue::Tuple(Vec::new())) {
            RawValue::Tuple(items) => items.push(value),
            other => *other = RawValue::Tuple(vec![value]),
        }
    }

    fn process_args_for_args(&self, state: &mut ParsingState) -> ParseStep {
        let mut pending: Vec<String> = std::mem::take(&mut state.largs);
        pending.extend(state.rargs.drain(..));

        let arities: Vec<Arity> = self.arguments.iter().map(|arg| arg.arity).collect();
        let (slots, rest) = unpack_args(pending, &arities);

        for (argument, slot) in self.arguments.iter().zip(slots) {
            let value = match slot {
                Slot::Single(value) => value.map(RawValue::Text),
                Slot::Fixed(values) => {
                    let holes = values.iter().filter(|v| v.is_none()).count();
                    if holes == values.len() {
                        None
                    } else if holes > 0 {
                        return Err(ParseError::Usage(format!(
                            "argument {} takes {} values",
                            argument.dest,
                            values.len()
                        )));
                    } else {
                        Some(RawValue::Tuple(
                            values.into_iter().flatten().map(RawValue::Text).collect(),
                        ))
                    }
                }
                Slot::Variadic(values) => {
                    if values.is_empty() && argument.has_envvar {
                        None
                    } else {
                        Some(RawValue::Tuple(values.into_iter().map(RawValue::Text).collect()))
                    }
                }
            };

            if let Some(value) = value {
                state.opts.insert(argument.dest.clone(), value);
            }
            state.order.push(argument.param_index);
        }

        state.largs = rest;
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum Slot {
    Single(Option<String>),
    Fixed(Vec<Option<String>>),
    Variadic(Vec<String>),
}

fn fetch(args: &mut VecDeque<String>, from_back: bool) -> Option<String> {
    if from_back {
        args.pop_back()
    } else {
        args.pop_front()
    }
}

/// Distribute positional tokens over argument arities
///
/// Arguments before the variadic one take from the front, arguments after
/// it take from the end, and the variadic one gets whatever is left.
fn unpack_args(args: Vec<String>, arities: &[Arity]) -> (Vec<Slot>, Vec<String>) {
    let mut args: VecDeque<String> = args.into();
    let mut arities: VecDeque<Arity> = arities.iter().copied().collect();
    let mut slots: Vec<Slot> = Vec::new();
    let mut variadic_pos: Option<usize> = None;

    loop {
        let from_back = variadic_pos.is_some();
        let next = if from_back {
            arities.pop_back()
        } else {
            arities.pop_front()
        };
        let Some(arity) = next else { break };

        match arity {
            Arity::Fixed(1) => slots.push(Slot::Single(fetch(&mut args, from_back))),
            Arity::Fixed(n) => {
                let mut values: Vec<Option<String>> =
                    (0..n).map(|_| fetch(&mut args, from_back)).collect();
                if from_back {
                    values.reverse();
                }
                slots.push(Slot::Fixed(values));
            }
            Arity::Variadic => {
                variadic_pos = Some(slots.len());
                slots.push(Slot::Variadic(Vec::new()));
            }
        }
    }

    if let Some(pos) = variadic_pos {
        slots[pos] = Slot::Variadic(args.drain(..).collect());
        slots[pos + 1..].reverse();
    }

    (slots, args.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_split_opt() {
        assert_eq!(split_opt("--name"), ("--", "name"));
        assert_eq!(split_opt("-n"), ("-", "n"));
        assert_eq!(split_opt("+w"), ("+", "w"));
        assert_eq!(split_opt("/debug"), ("/", "debug"));
        assert_eq!(split_opt("name"), ("", "name"));
        assert_eq!(split_opt(""), ("", ""));
    }

    #[test]
    fn test_unpack_args_variadic_in_the_middle() {
        let (slots, rest) = unpack_args(
            strings(&["a", "b", "c", "d"]),
            &[Arity::ONE, Arity::Variadic, Arity::ONE],
        );
        assert_eq!(
            slots,
            vec![
                Slot::Single(Some("a".to_owned())),
                Slot::Variadic(strings(&["b", "c"])),
                Slot::Single(Some("d".to_owned())),
            ]
        );
        assert!(rest.is_empty());
    }

    #[test]
    fn test_unpack_args_leaves_extras() {
        let (slots, rest) = unpack_args(strings(&["a", "b", "c"]), &[Arity::Fixed(2)]);
        assert_eq!(
            slots,
            vec![Slot::Fixed(vec![Some("a".to_owned()), Some("b".to_owned())])]
        );
        assert_eq!(rest, strings(&["c"]));
    }

    #[test]
    fn test_short_cluster_with_attached_value() {
        let mut parser = OptionParser::new(true, false, None);
        parser
            .add_option(&strings(&["-v"]), "verbose", 0, Action::Count, 1)
            .unwrap();
        parser
            .add_option(&strings(&["-n"]), "name", 1, Action::Store, 1)
            .unwrap();

        let outcome = parser.parse_args(strings(&["-vvnjoe", "rest"]), false).unwrap();
        assert_eq!(outcome.opts["verbose"], RawValue::from(2_i64));
        assert_eq!(outcome.opts["name"], RawValue::from("joe"));
        assert_eq!(outcome.args, strings(&["rest"]));
        assert_eq!(outcome.order, vec![0, 0, 1]);
    }

    #[test]
    fn test_no_such_option_suggestions() {
        let mut parser = OptionParser::new(true, false, None);
        parser
            .add_option(&strings(&["--verbose"]), "verbose", 0, Action::StoreConst(true.into()), 1)
            .unwrap();
        parser
            .add_option(&strings(&["--version"]), "version", 1, Action::StoreConst(true.into()), 1)
            .unwrap();

        let err = parser.parse_args(strings(&["--ver"]), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no such option: --ver  (Possible options: --verbose, --version)"
        );

        let err = parser.parse_args(strings(&["--verb"]), false).unwrap_err();
        assert_eq!(err.to_string(), "no such option: --verb  Did you mean --verbose?");
    }

    #[test]
    fn test_resilient_returns_partial_state() {
        let mut parser = OptionParser::new(true, false, None);
        parser
            .add_option(&strings(&["--name"]), "name", 0, Action::Store, 1)
            .unwrap();

        let outcome = parser.parse_args(strings(&["--name"]), true).unwrap();
        assert!(outcome.opts.is_empty());
    }
}
