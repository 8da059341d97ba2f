//! Mock system implementation for testing

use tracing::error;

use super::System;
use std::collections::{HashMap, HashSet, VecDeque};
use std::env::VarError;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory implementation of System trait for testing
///
/// `MockSystem` provides an in-memory filesystem, environment and terminal:
/// scripted input lines feed prompts, and everything echoed is captured.
///
/// # Example
/// ```
/// use cordage::system::{mock::MockSystem, System};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_env("HOME", "/home/user")
///     .with_file("/test/file.txt", b"Hello, world!")
///     .with_input(["yes"]);
///
/// assert_eq!(system.env_var("HOME").unwrap(), "/home/user");
/// assert!(system.exists(Path::new("/test/file.txt")));
/// assert_eq!(system.read_line().unwrap().as_deref(), Some("yes"));
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    env_vars: HashMap<String, String>,
    current_dir: PathBuf,
    home_dir: Option<PathBuf>,
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
    readonly: HashSet<PathBuf>,
    input: VecDeque<String>,
    interrupt_when_drained: bool,
    stdout: String,
    stderr: String,
}

impl MockSystem {
    /// Create a new `MockSystem` with default state
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                env_vars: HashMap::new(),
                current_dir: PathBuf::from("/"),
                home_dir: Some(PathBuf::from("/home/user")),
                files: HashMap::new(),
                dirs: HashSet::from([PathBuf::from("/")]),
                readonly: HashSet::new(),
                input: VecDeque::new(),
                interrupt_when_drained: false,
                stdout: String::new(),
                stderr: String::new(),
            })),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MockSystemState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MockSystemState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set an environment variable (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_env(self, key: &str, value: &str) -> Self {
        self.write_state()
            .env_vars
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Set the current working directory (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_current_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        self.write_state().current_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the home directory (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_home_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        self.write_state().home_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add a file with contents (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> Self {
        let path_buf = path.as_ref().to_path_buf();
        {
            let mut state = self.write_state();
            if let Some(parent) = path_buf.parent() {
                Self::ensure_parent_dirs(&mut state.dirs, parent);
            }
            state.files.insert(path_buf, contents.to_vec());
        }
        self
    }

    /// Add a directory (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_dir<P: AsRef<Path>>(self, path: P) -> Self {
        let path_buf = path.as_ref().to_path_buf();
        {
            let mut state = self.write_state();
            Self::ensure_parent_dirs(&mut state.dirs, &path_buf);
            state.dirs.insert(path_buf);
        }
        self
    }

    /// Mark an existing path as read-only (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_readonly<P: AsRef<Path>>(self, path: P) -> Self {
        self.write_state()
            .readonly
            .insert(path.as_ref().to_path_buf());
        self
    }

    /// Queue lines that will be returned by `read_line` (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_input<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_state()
            .input
            .extend(lines.into_iter().map(Into::into));
        self
    }

    /// Simulate Ctrl-C once the queued input is used up (builder pattern)
    ///
    /// Reads past the last queued line fail with `ErrorKind::Interrupted`
    /// instead of reporting end of input.
    #[must_use]
    #[inline]
    pub fn with_interrupt(self) -> Self {
        self.write_state().interrupt_when_drained = true;
        self
    }

    /// Next queued line, or the simulated interrupt
    fn next_input(&self) -> io::Result<Option<String>> {
        let mut state = self.write_state();
        match state.input.pop_front() {
            Some(line) => Ok(Some(line)),
            None if state.interrupt_when_drained => Err(io::Error::from(io::ErrorKind::Interrupted)),
            None => Ok(None),
        }
    }

    /// Everything echoed to standard output so far
    #[must_use]
    #[inline]
    pub fn captured_stdout(&self) -> String {
        self.read_state().stdout.clone()
    }

    /// Everything echoed to standard error so far
    #[must_use]
    #[inline]
    pub fn captured_stderr(&self) -> String {
        self.read_state().stderr.clone()
    }

    /// Contents of an in-memory file as UTF-8
    #[must_use]
    #[inline]
    pub fn file_contents<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        self.read_state()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    #[inline]
    fn ensure_parent_dirs(dirs: &mut HashSet<PathBuf>, path: &Path) {
        let mut current = path;
        while let Some(parent) = current.parent() {
            dirs.insert(parent.to_path_buf());
            current = parent;
            if parent == Path::new("") || parent == Path::new("/") {
                break;
            }
        }
        dirs.insert(path.to_path_buf());
    }

    fn store_file(&self, path: &Path, contents: &[u8], append: bool) -> io::Result<()> {
        let mut state = self.write_state();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !state.dirs.contains(parent)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }

        if state.readonly.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Permission denied: {}", path.display()),
            ));
        }

        if append {
            state
                .files
                .entry(path.to_path_buf())
                .or_default()
                .extend_from_slice(contents);
        } else {
            state.files.insert(path.to_path_buf(), contents.to_vec());
        }
        Ok(())
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        self.read_state()
            .env_vars
            .get(key)
            .cloned()
            .ok_or(VarError::NotPresent)
    }

    #[inline]
    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.read_state().current_dir.clone())
    }

    #[inline]
    fn home_dir(&self) -> Option<PathBuf> {
        self.read_state().home_dir.clone()
    }

    #[inline]
    fn echo(&self, text: &str) {
        self.write_state().stdout.push_str(text);
    }

    #[inline]
    fn echo_err(&self, text: &str) {
        self.write_state().stderr.push_str(text);
    }

    #[inline]
    fn read_line(&self) -> io::Result<Option<String>> {
        let line = self.next_input()?;
        if let Some(value) = line.as_ref() {
            // Mirror a terminal echoing typed characters
            self.echo(&format!("{value}\n"));
        }
        Ok(line)
    }

    #[inline]
    fn read_hidden_line(&self) -> io::Result<Option<String>> {
        let line = self.next_input()?;
        if line.is_some() {
            self.echo("\n");
        }
        Ok(line)
    }

    #[inline]
    fn stdin(&self) -> Box<dyn Read> {
        let mut state = self.write_state();
        let mut buffer = String::new();
        for line in state.input.drain(..) {
            buffer.push_str(&line);
            buffer.push('\n');
        }
        Box::new(Cursor::new(buffer.into_bytes()))
    }

    #[inline]
    fn stdout(&self) -> Box<dyn Write> {
        Box::new(MockStdout {
            system: self.clone(),
        })
    }

    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self
            .read_state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                )
            })?;
        String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        let state = self.read_state();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        self.read_state().files.contains_key(path)
    }

    #[inline]
    fn is_dir(&self, path: &Path) -> bool {
        self.read_state().dirs.contains(path)
    }

    #[inline]
    fn is_writable(&self, path: &Path) -> bool {
        let state = self.read_state();
        (state.files.contains_key(path) || state.dirs.contains(path))
            && !state.readonly.contains(path)
    }

    #[inline]
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.read_state().current_dir.join(path)
        };
        let normalized = crate::utils::path::normalize_path(&absolute);
        if self.exists(&normalized) {
            Ok(normalized)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Path not found: {}", path.display()),
            ))
        }
    }

    #[inline]
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        let bytes = self
            .read_state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("No such file or directory: {}", path.display()),
                )
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    #[inline]
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        // Truncate right away so the file exists even if nothing is written
        self.store_file(path, &[], false)?;
        Ok(Box::new(MockWriter {
            path: path.to_path_buf(),
            buffer: Vec::new(),
            system: self.clone(),
        }))
    }

    #[inline]
    fn append(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        self.store_file(path, &[], true)?;
        Ok(Box::new(MockWriter {
            path: path.to_path_buf(),
            buffer: Vec::new(),
            system: self.clone(),
        }))
    }
}

/// Custom writer for `MockSystem` that appends to the in-memory filesystem
struct MockWriter {
    path: PathBuf,
    buffer: Vec<u8>,
    system: MockSystem,
}

impl Write for MockWriter {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buffer);
        self.system.store_file(&self.path, &pending, true)
    }
}

impl Drop for MockWriter {
    #[inline]
    fn drop(&mut self) {
        match self.flush() {
            Ok(()) => (),
            Err(e) => error!("Failed to flush mock writer: {e}"),
        }
    }
}

/// Standard output stream backed by the captured stdout buffer
struct MockStdout {
    system: MockSystem,
}

impl Write for MockStdout {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.system.echo(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
