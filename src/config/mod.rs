//! Default maps: parameter defaults supplied from outside the command tree
//!
//! A default map is consulted after the command line and before environment
//! variables. Nested maps hold the defaults of subcommands, keyed by the
//! name the subcommand was invoked as.

pub mod schema;
pub mod yaml;

use crate::core::value::{RawValue, Value};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub use yaml::load_default_map;

/// Producer for a default computed at lookup time
pub type DefaultProducer = Rc<dyn Fn() -> RawValue>;

/// One entry in a [`DefaultMap`]
#[derive(Clone)]
pub enum DefaultEntry {
    Value(RawValue),
    Producer(DefaultProducer),
    Nested(DefaultMap),
}

impl fmt::Debug for DefaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Value(ref value) => f.debug_tuple("Value").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
            Self::Nested(ref map) => f.debug_tuple("Nested").field(map).finish(),
        }
    }
}

/// Parameter defaults for one command and, nested, for its subcommands
#[derive(Debug, Clone, Default)]
pub struct DefaultMap {
    entries: HashMap<String, DefaultEntry>,
}

impl DefaultMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal default (builder pattern)
    #[must_use]
    pub fn with_value<V: Into<RawValue>>(mut self, name: &str, value: V) -> Self {
        self.entries
            .insert(name.to_owned(), DefaultEntry::Value(value.into()));
        self
    }

    /// Add a default computed on every lookup (builder pattern)
    #[must_use]
    pub fn with_producer<F>(mut self, name: &str, producer: F) -> Self
    where
        F: Fn() -> RawValue + 'static,
    {
        self.entries
            .insert(name.to_owned(), DefaultEntry::Producer(Rc::new(producer)));
        self
    }

    /// Add the defaults of a subcommand (builder pattern)
    #[must_use]
    pub fn with_nested(mut self, command: &str, map: Self) -> Self {
        self.entries
            .insert(command.to_owned(), DefaultEntry::Nested(map));
        self
    }

    /// The raw entry for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DefaultEntry> {
        self.entries.get(name)
    }

    /// The map for a subcommand invoked as `command`
    #[must_use]
    pub fn nested(&self, command: &str) -> Option<&Self> {
        match self.entries.get(command) {
            Some(DefaultEntry::Nested(map)) => Some(map),
            _ => None,
        }
    }

    /// Resolve the default for a parameter, calling producers
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<RawValue> {
        match self.entries.get(name)? {
            DefaultEntry::Value(value) => Some(value.clone()),
            DefaultEntry::Producer(producer) => Some(producer()),
            DefaultEntry::Nested(_) => None,
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a map from a JSON object
    ///
    /// Strings stay text, numbers and booleans become typed values, arrays
    /// become tuples, objects become nested maps and nulls are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(object) = value else {
            return Err(anyhow!("A default map must be an object, got: {value}"));
        };

        let mut map = Self::new();
        for (key, item) in object {
            let entry = match *item {
                serde_json::Value::Null => continue,
                serde_json::Value::Object(_) => DefaultEntry::Nested(Self::from_json(item)?),
                ref other => DefaultEntry::Value(raw_from_json(other)),
            };
            map.entries.insert(key.clone(), entry);
        }
        Ok(map)
    }
}

fn raw_from_json(value: &serde_json::Value) -> RawValue {
    match *value {
        serde_json::Value::String(ref s) => RawValue::Text(s.clone()),
        serde_json::Value::Bool(b) => RawValue::from(b),
        serde_json::Value::Number(ref n) => match n.as_i64() {
            Some(i) => RawValue::from(i),
            None => n
                .as_f64()
                .map_or_else(|| RawValue::Text(n.to_string()), RawValue::from),
        },
        serde_json::Value::Array(ref items) => {
            RawValue::Tuple(items.iter().map(raw_from_json).collect())
        }
        serde_json::Value::Null | serde_json::Value::Object(_) => {
            RawValue::Typed(Value::Str(value.to_string()))
        }
    }
}
