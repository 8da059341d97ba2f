//! Scalar types: text, integers, floats, booleans and integer ranges

use super::ParamType;
use crate::core::context::Context;
use crate::core::parameter::Parameter;
use crate::core::value::{RawValue, Value};
use crate::error::{CliError, Result};

/// Free text; typed values are stringified
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl ParamType for StringType {
    fn name(&self) -> &str {
        "text"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, _ctx: &Context<'_>) -> Result<Value> {
        Ok(match *raw {
            RawValue::Text(ref s) => Value::Str(s.clone()),
            RawValue::Typed(Value::Str(ref s)) => Value::Str(s.clone()),
            ref other => Value::Str(other.to_string()),
        })
    }
}

/// Signed 64-bit integers
#[derive(Debug, Clone, Copy, Default)]
pub struct IntType;

impl IntType {
    fn parse(raw: &RawValue) -> Result<i64> {
        match *raw {
            RawValue::Typed(Value::Int(n)) => Ok(n),
            RawValue::Typed(Value::Bool(b)) => Ok(i64::from(b)),
            ref other => {
                let text = other.to_string();
                text.trim().parse::<i64>().map_err(|_| {
                    CliError::bad_parameter(format!("{text} is not a valid integer"))
                })
            }
        }
    }
}

impl ParamType for IntType {
    fn name(&self) -> &str {
        "integer"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, _ctx: &Context<'_>) -> Result<Value> {
        Self::parse(raw).map(Value::Int)
    }
}

/// 64-bit floating point numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl ParamType for FloatType {
    fn name(&self) -> &str {
        "float"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, _ctx: &Context<'_>) -> Result<Value> {
        if let RawValue::Typed(ref value) = *raw
            && let Some(number) = value.as_float()
        {
            return Ok(Value::Float(number));
        }
        let text = raw.to_string();
        text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            CliError::bad_parameter(format!("{text} is not a valid floating point value"))
        })
    }
}

/// Booleans spelled `1 true t yes y on` / `0 false f no n off`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl ParamType for BoolType {
    fn name(&self) -> &str {
        "boolean"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, _ctx: &Context<'_>) -> Result<Value> {
        if let RawValue::Typed(Value::Bool(b)) = *raw {
            return Ok(Value::Bool(b));
        }
        let text = raw.to_string();
        match text.to_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "on" => Ok(Value::Bool(true)),
            "0" | "false" | "f" | "no" | "n" | "off" => Ok(Value::Bool(false)),
            _ => Err(CliError::bad_parameter(format!(
                "{text} is not a valid boolean"
            ))),
        }
    }

    fn is_bool(&self) -> bool {
        true
    }
}

/// Integers restricted to an inclusive range
///
/// With `clamp`, out-of-range values snap to the nearest bound instead of
/// failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntRange {
    min: Option<i64>,
    max: Option<i64>,
    clamp: bool,
}

impl IntRange {
    /// An unbounded range; add bounds with [`Self::min`] and [`Self::max`]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: None,
            max: None,
            clamp: false,
        }
    }

    /// Set the lower bound
    #[must_use]
    pub const fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the upper bound
    #[must_use]
    pub const fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Clamp instead of failing
    #[must_use]
    pub const fn clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }
}

impl ParamType for IntRange {
    fn name(&self) -> &str {
        "integer range"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, _ctx: &Context<'_>) -> Result<Value> {
        let value = IntType::parse(raw)?;

        if self.clamp {
            let mut clamped = value;
            if let Some(min) = self.min {
                clamped = clamped.max(min);
            }
            if let Some(max) = self.max {
                clamped = clamped.min(max);
            }
            return Ok(Value::Int(clamped));
        }

        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if !below && !above {
            return Ok(Value::Int(value));
        }

        let message = match (self.min, self.max) {
            (Some(min), Some(max)) => {
                format!("{value} is not in the valid range of {min} to {max}.")
            }
            (Some(min), None) => format!("{value} is smaller than the minimum valid value {min}."),
            (None, Some(max)) => format!("{value} is bigger than the maximum valid value {max}."),
            (None, None) => return Ok(Value::Int(value)),
        };
        Err(CliError::bad_parameter(message))
    }
}
