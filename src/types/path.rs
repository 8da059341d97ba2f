//! Filesystem paths with existence and permission checks

use super::ParamType;
use crate::core::context::Context;
use crate::core::parameter::Parameter;
use crate::core::value::{RawValue, Value};
use crate::error::{CliError, Result};
use crate::utils::path::{expand_user, normalize_path};
use std::env;
use std::path::PathBuf;

/// A path, optionally validated against the filesystem
///
/// Checks go through the context's [`crate::system::System`], so they work
/// against the in-memory mock as well as the real filesystem.
#[derive(Debug, Clone)]
#[expect(clippy::struct_excessive_bools, reason = "independent path checks")]
pub struct PathType {
    exists: bool,
    file_okay: bool,
    dir_okay: bool,
    writable: bool,
    readable: bool,
    resolve_path: bool,
    allow_dash: bool,
    expand_user: bool,
}

impl Default for PathType {
    fn default() -> Self {
        Self::new()
    }
}

impl PathType {
    /// A path with no checks; files and directories are both accepted
    #[must_use]
    pub const fn new() -> Self {
        Self {
            exists: false,
            file_okay: true,
            dir_okay: true,
            writable: false,
            readable: true,
            resolve_path: false,
            allow_dash: false,
            expand_user: false,
        }
    }

    /// Require the path to exist
    #[must_use]
    pub const fn exists(mut self, exists: bool) -> Self {
        self.exists = exists;
        self
    }

    /// Whether a file is acceptable
    #[must_use]
    pub const fn file_okay(mut self, file_okay: bool) -> Self {
        self.file_okay = file_okay;
        self
    }

    /// Whether a directory is acceptable
    #[must_use]
    pub const fn dir_okay(mut self, dir_okay: bool) -> Self {
        self.dir_okay = dir_okay;
        self
    }

    /// Require an existing path to be writable
    #[must_use]
    pub const fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Require an existing file to be readable
    #[must_use]
    pub const fn readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    /// Make the path absolute and resolve `.` and `..`
    #[must_use]
    pub const fn resolve_path(mut self, resolve_path: bool) -> Self {
        self.resolve_path = resolve_path;
        self
    }

    /// Accept `-` as standard input/output
    #[must_use]
    pub const fn allow_dash(mut self, allow_dash: bool) -> Self {
        self.allow_dash = allow_dash;
        self
    }

    /// Expand a leading `~` to the home directory
    #[must_use]
    pub const fn expand_user(mut self, expand_user: bool) -> Self {
        self.expand_user = expand_user;
        self
    }

    const fn path_type(&self) -> &'static str {
        match (self.file_okay, self.dir_okay) {
            (true, false) => "File",
            (false, true) => "Directory",
            _ => "Path",
        }
    }

    fn resolve(path: PathBuf, ctx: &Context<'_>) -> PathBuf {
        let system = ctx.system();
        if let Ok(canonical) = system.canonicalize(&path) {
            return canonical;
        }
        let absolute = if path.is_absolute() {
            path
        } else {
            match system.current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path,
            }
        };
        normalize_path(&absolute)
    }
}

impl ParamType for PathType {
    fn name(&self) -> &str {
        match (self.file_okay, self.dir_okay) {
            (true, false) => "file",
            (false, true) => "directory",
            _ => "path",
        }
    }

    fn convert(&self, raw: &RawValue, _param: &Parameter, ctx: &Context<'_>) -> Result<Value> {
        let text = match *raw {
            RawValue::Typed(Value::Path(ref path)) => path.to_string_lossy().into_owned(),
            ref other => other.to_string(),
        };

        if self.file_okay && self.allow_dash && text == "-" {
            return Ok(Value::Path(PathBuf::from(text)));
        }

        let system = ctx.system();
        let mut path = if self.expand_user {
            expand_user(&text, system.home_dir().as_deref())
        } else {
            PathBuf::from(&text)
        };
        if self.resolve_path {
            path = Self::resolve(path, ctx);
        }

        let kind = self.path_type();
        if !system.exists(&path) {
            if !self.exists {
                return Ok(Value::Path(path));
            }
            return Err(CliError::bad_parameter(format!(
                "{kind} \"{text}\" does not exist."
            )));
        }

        if !self.file_okay && system.is_file(&path) {
            return Err(CliError::bad_parameter(format!("{kind} \"{text}\" is a file.")));
        }
        if !self.dir_okay && system.is_dir(&path) {
            return Err(CliError::bad_parameter(format!(
                "{kind} \"{text}\" is a directory."
            )));
        }
        if self.writable && !system.is_writable(&path) {
            return Err(CliError::bad_parameter(format!(
                "{kind} \"{text}\" is not writable."
            )));
        }
        if self.readable && system.is_file(&path) && system.open(&path).is_err() {
            return Err(CliError::bad_parameter(format!(
                "{kind} \"{text}\" is not readable."
            )));
        }

        Ok(Value::Path(path))
    }

    fn split_envvar_value(&self, raw: &str) -> Vec<String> {
        env::split_paths(raw)
            .map(|path| path.to_string_lossy().into_owned())
            .filter(|path| !path.is_empty())
            .collect()
    }
}
