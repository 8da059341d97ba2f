//! Interactive prompts over a [`System`]
//!
//! Both loops read one line at a time and re-ask on bad input. End of input
//! and Ctrl-C turn into [`CliError::Abort`].

use crate::core::value::Value;
use crate::error::{CliError, Result};
use crate::system::System;
use anyhow::Context as _;
use std::io;
use tracing::debug;

const PROMPT_SUFFIX: &str = ": ";
const CONFIRMATION_TEXT: &str = "Repeat for confirmation";

/// How [`prompt`] reads and checks the answer
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    /// Used (and shown in brackets) when the answer is empty
    pub default: Option<String>,
    /// Read without echo
    pub hide_input: bool,
    /// Ask a second time and require the same answer
    pub confirmation_prompt: bool,
}

fn build_prompt(text: &str, default: Option<&str>) -> String {
    match default {
        Some(default) => format!("{text} [{default}]{PROMPT_SUFFIX}"),
        None => format!("{text}{PROMPT_SUFFIX}"),
    }
}

fn read_answer(system: &dyn System, prompt: &str, hide_input: bool) -> Result<String> {
    system.echo(prompt);
    let read = if hide_input {
        system.read_hidden_line()
    } else {
        system.read_line()
    };
    let line = match read {
        Err(e) if e.kind() == io::ErrorKind::Interrupted => {
            debug!("Interrupted while prompting");
            system.echo("\n");
            return Err(CliError::Abort);
        }
        read => read.context("Failed to read from standard input")?,
    };

    match line {
        Some(line) => Ok(line.trim_end_matches(['\r', '\n']).to_owned()),
        None => {
            debug!("End of input while prompting");
            if hide_input {
                system.echo("\n");
            }
            Err(CliError::Abort)
        }
    }
}

/// Message of a rejected answer, or `None` if the error must propagate
fn rejection_message(error: &CliError) -> Option<&str> {
    match *error {
        CliError::BadParameter { ref message, .. }
        | CliError::Usage { ref message, .. }
        | CliError::MissingParameter { ref message, .. } => Some(message),
        _ => None,
    }
}

/// Ask for a value until `convert` accepts it
///
/// Conversion failures print `Error: <message>` and ask again.
///
/// # Errors
///
/// Returns `CliError::Abort` at end of input, and any error from `convert`
/// that is not a usage-class rejection
pub fn prompt<F>(system: &dyn System, text: &str, options: &PromptOptions, convert: F) -> Result<Value>
where
    F: Fn(&str) -> Result<Value>,
{
    let prompt = build_prompt(text, options.default.as_deref());

    loop {
        let answer = loop {
            let answer = read_answer(system, &prompt, options.hide_input)?;
            if !answer.is_empty() {
                break answer;
            }
            if let Some(default) = options.default.as_ref() {
                break default.clone();
            }
        };

        let value = match convert(&answer) {
            Ok(value) => value,
            Err(e) => match rejection_message(&e) {
                Some(message) => {
                    system.echo(&format!("Error: {message}\n"));
                    continue;
                }
                None => return Err(e),
            },
        };

        if !options.confirmation_prompt {
            return Ok(value);
        }

        let repeated = loop {
            let repeated = read_answer(
                system,
                &build_prompt(CONFIRMATION_TEXT, None),
                options.hide_input,
            )?;
            if !repeated.is_empty() {
                break repeated;
            }
        };
        if repeated == answer {
            return Ok(value);
        }
        system.echo("Error: the two entered values do not match\n");
    }
}

/// Ask a yes/no question
///
/// An empty answer selects `default`.
///
/// # Errors
///
/// Returns `CliError::Abort` at end of input
pub fn confirm(system: &dyn System, text: &str, default: bool) -> Result<bool> {
    let choices = if default { "Y/n" } else { "y/N" };
    let prompt = build_prompt(text, Some(choices));

    loop {
        let answer = read_answer(system, &prompt, false)?;
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            "" => return Ok(default),
            _ => system.echo("Error: invalid input\n"),
        }
    }
}
