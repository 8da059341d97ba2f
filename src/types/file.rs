//! Opened files bound to a parameter

use super::ParamType;
use crate::core::context::Context;
use crate::core::parameter::Parameter;
use crate::core::value::{FileHandle, FileMode, RawValue, Value};
use crate::error::{CliError, Result};
use std::io;
use std::path::Path;

/// A file opened during conversion
///
/// `-` names standard input (read mode) or standard output (write modes).
/// The converting context closes the file when its scope ends; standard
/// streams are only flushed.
#[derive(Debug, Clone, Copy)]
pub struct FileType {
    mode: FileMode,
}

impl FileType {
    /// Open files in `mode`
    #[must_use]
    pub const fn new(mode: FileMode) -> Self {
        Self { mode }
    }
}

impl Default for FileType {
    fn default() -> Self {
        Self::new(FileMode::Read)
    }
}

fn describe(error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::NotFound => "No such file or directory".to_owned(),
        io::ErrorKind::PermissionDenied => "Permission denied".to_owned(),
        _ => error.to_string(),
    }
}

impl ParamType for FileType {
    fn name(&self) -> &str {
        "filename"
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, ctx: &Context<'_>) -> Result<Value> {
        if let RawValue::Typed(Value::File(ref handle)) = *raw {
            return Ok(Value::File(handle.clone()));
        }

        let name = raw.to_string();
        let system = ctx.system();

        if name == "-" {
            let handle = if self.mode.is_write() {
                FileHandle::writer(&name, self.mode, system.stdout())
            } else {
                FileHandle::reader(&name, system.stdin())
            };
            let flushed = handle.clone();
            ctx.call_on_close(move || {
                if let Err(e) = flushed.flush() {
                    tracing::warn!("Failed to flush {}: {e}", flushed.name());
                }
            });
            return Ok(Value::File(handle));
        }

        let path = Path::new(&name);
        let opened = match self.mode {
            FileMode::Read => system.open(path).map(|reader| FileHandle::reader(&name, reader)),
            FileMode::Write => system
                .create(path)
                .map(|writer| FileHandle::writer(&name, self.mode, writer)),
            FileMode::Append => system
                .append(path)
                .map(|writer| FileHandle::writer(&name, self.mode, writer)),
        };
        let handle = opened.map_err(|e| {
            CliError::bad_parameter(format!("Could not open file: {name}: {}", describe(&e)))
        })?;

        tracing::debug!("Opened {name} ({:?})", self.mode);
        let owned = handle.clone();
        ctx.call_on_close(move || owned.close());
        Ok(Value::File(handle))
    }
}
