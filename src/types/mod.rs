//! Parameter types
//!
//! A type turns one raw value into a typed [`Value`]. Composite values are
//! handled by the parameter, which converts element by element.

use crate::core::context::Context;
use crate::core::parameter::Parameter;
use crate::core::value::{RawValue, Value};
use crate::error::Result;
use std::fmt;
use std::rc::Rc;

pub mod basic;
pub mod choice;
pub mod file;
pub mod path;

pub use basic::{BoolType, FloatType, IntRange, IntType, StringType};
pub use choice::Choice;
pub use file::FileType;
pub use path::PathType;

/// Conversion contract for parameter values
pub trait ParamType: fmt::Debug {
    /// Descriptive name, upper-cased for the default metavar
    fn name(&self) -> &str;

    /// Convert one raw value
    ///
    /// # Errors
    ///
    /// Returns `CliError::BadParameter` when the value is not acceptable
    fn convert(&self, raw: &RawValue, param: &Parameter, ctx: &Context<'_>) -> Result<Value>;

    /// Split an environment variable value into its parts
    fn split_envvar_value(&self, raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_owned).collect()
    }

    /// Metavar override for help output
    fn metavar(&self, _param: &Parameter) -> Option<String> {
        None
    }

    /// Extra text for missing-parameter errors
    fn missing_message(&self, _param: &Parameter) -> Option<String> {
        None
    }

    /// The fixed set of accepted values, if any
    fn choices(&self) -> Option<&[String]> {
        None
    }

    /// Whether this is the boolean type
    fn is_bool(&self) -> bool {
        false
    }
}

/// Shared handle to a parameter type
pub type TypeRef = Rc<dyn ParamType>;

/// Pick a type from a default value when none is declared
#[must_use]
pub fn guess_type(default: Option<&RawValue>) -> TypeRef {
    match default {
        Some(RawValue::Typed(value)) => type_of_value(value),
        Some(RawValue::Tuple(items)) => items
            .first()
            .map_or_else(|| Rc::new(StringType) as TypeRef, |first| guess_type(Some(first))),
        Some(RawValue::Text(_)) | None => Rc::new(StringType),
    }
}

fn type_of_value(value: &Value) -> TypeRef {
    match *value {
        Value::Int(_) => Rc::new(IntType),
        Value::Float(_) => Rc::new(FloatType),
        Value::Bool(_) => Rc::new(BoolType),
        Value::Path(_) => Rc::new(PathType::new()),
        Value::Tuple(ref items) | Value::List(ref items) => items
            .first()
            .map_or_else(|| Rc::new(StringType) as TypeRef, type_of_value),
        _ => Rc::new(StringType),
    }
}
