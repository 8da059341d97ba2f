//! Fixed set of accepted strings

use super::ParamType;
use crate::core::context::Context;
use crate::core::parameter::Parameter;
use crate::core::value::{RawValue, Value};
use crate::error::{CliError, Result};

/// Accepts only the declared choices
///
/// Matching applies the context's token normalizer and, unless
/// case-sensitive, ignores case. The declared spelling is returned.
#[derive(Debug, Clone)]
pub struct Choice {
    choices: Vec<String>,
    case_sensitive: bool,
}

impl Choice {
    /// Create a case-sensitive choice
    #[must_use]
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            case_sensitive: true,
        }
    }

    /// Toggle case-sensitive matching
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    fn normalize(&self, text: &str, ctx: &Context<'_>) -> String {
        let text = match ctx.token_normalize() {
            Some(normalize) => normalize(text),
            None => text.to_owned(),
        };
        if self.case_sensitive {
            text
        } else {
            text.to_lowercase()
        }
    }
}

impl ParamType for Choice {
    fn name(&self) -> &str {
        "choice"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, ctx: &Context<'_>) -> Result<Value> {
        let value = raw.to_string();
        if self.choices.contains(&value) {
            return Ok(Value::Str(value));
        }

        let wanted = self.normalize(&value, ctx);
        if let Some(choice) = self
            .choices
            .iter()
            .find(|choice| self.normalize(choice, ctx) == wanted)
        {
            return Ok(Value::Str(choice.clone()));
        }

        Err(CliError::bad_parameter(format!(
            "invalid choice: {value}. (choose from {})",
            self.choices.join(", ")
        )))
    }

    fn metavar(&self, _param: &Parameter) -> Option<String> {
        Some(format!("[{}]", self.choices.join("|")))
    }

    fn missing_message(&self, _param: &Parameter) -> Option<String> {
        Some(format!("Choose from:\n\t{}.", self.choices.join(",\n\t")))
    }

    fn choices(&self) -> Option<&[String]> {
        Some(&self.choices)
    }
}
