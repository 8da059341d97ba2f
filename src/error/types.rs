//! Error types with exit codes

use crate::system::System;
use thiserror::Error;

/// Exit code used for usage-class failures
pub const USAGE_EXIT_CODE: i32 = 2;

/// Exit code used for every other failure, aborts included
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Snapshot of the invocation an error was attributed to
///
/// A [`crate::Context`] cannot outlive the dispatch that created it, so errors
/// keep the rendered usage line and help hint instead of the context itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInfo {
    /// Rendered usage line, e.g. `Usage: tool sub [OPTIONS] NAME`
    pub usage: String,
    /// `Try "tool sub --help" for help.` when a help option exists
    pub help_hint: Option<String>,
}

/// Main error type for command dispatch
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CliError {
    /// Bad invocation: unknown command, extra arguments, tokenizer failures
    #[error("{message}")]
    Usage {
        message: String,
        usage: Option<UsageInfo>,
    },

    /// A value failed type conversion or validation
    #[error("Invalid value{}: {message}", hint_suffix(.param_hint))]
    BadParameter {
        message: String,
        param_hint: Option<String>,
        usage: Option<UsageInfo>,
    },

    /// A required parameter had no value from any source
    #[error("{message}")]
    MissingParameter {
        message: String,
        usage: Option<UsageInfo>,
    },

    /// Explicit user decline or interrupt
    #[error("Aborted!")]
    Abort,

    /// Early, deliberate termination (help and version output)
    #[error("exit requested with code {code}")]
    Exit { code: i32 },

    /// The command tree itself is malformed
    #[error("Invalid declaration: {message}")]
    Declaration { message: String },

    /// Anything raised by user callbacks
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn hint_suffix(param_hint: &Option<String>) -> String {
    param_hint
        .as_ref()
        .map(|hint| format!(" for {hint}"))
        .unwrap_or_default()
}

impl CliError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Usage { .. } | Self::BadParameter { .. } | Self::MissingParameter { .. } => {
                USAGE_EXIT_CODE
            }
            Self::Exit { code } => code,
            Self::Abort | Self::Declaration { .. } | Self::Other(_) => FAILURE_EXIT_CODE,
        }
    }

    /// Create a usage error
    #[inline]
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Self::Usage {
            message: message.into(),
            usage: None,
        }
    }

    /// Create a conversion/validation error not yet attributed to a parameter
    #[inline]
    pub fn bad_parameter<S: Into<String>>(message: S) -> Self {
        Self::BadParameter {
            message: message.into(),
            param_hint: None,
            usage: None,
        }
    }

    /// Create a missing-parameter error
    #[inline]
    pub fn missing_parameter<S: Into<String>>(message: S) -> Self {
        Self::MissingParameter {
            message: message.into(),
            usage: None,
        }
    }

    /// Create a declaration error
    #[inline]
    pub fn declaration<S: Into<String>>(message: S) -> Self {
        Self::Declaration {
            message: message.into(),
        }
    }

    /// Whether the error terminates the program without printing anything
    #[must_use]
    #[inline]
    pub const fn is_silent(&self) -> bool {
        matches!(*self, Self::Exit { .. })
    }

    /// Attach a usage snapshot unless one is already attached
    #[must_use]
    pub fn with_usage(mut self, info: impl FnOnce() -> UsageInfo) -> Self {
        match self {
            Self::Usage { ref mut usage, .. }
            | Self::BadParameter { ref mut usage, .. }
            | Self::MissingParameter { ref mut usage, .. } => {
                if usage.is_none() {
                    *usage = Some(info());
                }
            }
            Self::Abort
            | Self::Exit { .. }
            | Self::Declaration { .. }
            | Self::Other(_) => {}
        }
        self
    }

    /// Attribute a conversion error to a parameter unless already attributed
    #[must_use]
    pub fn with_param_hint(mut self, hint: impl FnOnce() -> String) -> Self {
        if let Self::BadParameter {
            ref mut param_hint, ..
        } = self
            && param_hint.is_none()
        {
            *param_hint = Some(hint());
        }
        self
    }

    /// The usage snapshot carried by usage-class errors
    #[must_use]
    pub const fn usage_info(&self) -> Option<&UsageInfo> {
        match *self {
            Self::Usage { ref usage, .. }
            | Self::BadParameter { ref usage, .. }
            | Self::MissingParameter { ref usage, .. } => usage.as_ref(),
            Self::Abort
            | Self::Exit { .. }
            | Self::Declaration { .. }
            | Self::Other(_) => None,
        }
    }

    /// Render the error to the error stream
    ///
    /// Aborts and exits print nothing; usage-class errors print the usage
    /// line and help hint before the message.
    pub fn show(&self, system: &dyn System) {
        if matches!(*self, Self::Abort | Self::Exit { .. }) {
            return;
        }

        if let Some(info) = self.usage_info() {
            let mut text = info.usage.clone();
            text.push('\n');
            if let Some(hint) = info.help_hint.as_ref() {
                text.push_str(hint);
                text.push('\n');
            }
            text.push('\n');
            system.echo_err(&text);
        }

        system.echo_err(&format!("Error: {self}\n"));
    }
}
