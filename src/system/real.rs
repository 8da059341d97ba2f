//! Real system implementation using `std::env`, `std::io` and `std::fs`

use super::System;
use std::env::VarError;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead as _, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread;
use tracing::debug;

/// Production implementation of System trait
///
/// This implementation directly delegates to the standard library's
/// environment, terminal and filesystem functions.
#[derive(Debug, Clone, Copy)]
pub struct RealSystem;

impl RealSystem {
    /// Create a new `RealSystem` instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RealSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a trailing `\n` or `\r\n`
fn trim_line_end(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

enum ReadEvent {
    Line(io::Result<Option<String>>),
    Interrupted,
}

/// Receiver of Ctrl-C while a prompt is waiting for input
static PENDING_READ: Mutex<Option<Sender<ReadEvent>>> = Mutex::new(None);
static INTERRUPT_HANDLER: OnceLock<bool> = OnceLock::new();

/// Install the SIGINT handler once
///
/// Returns `false` when the host application already owns the signal.
/// Outside of a prompt, Ctrl-C exits with the conventional status 130.
fn interrupt_handler_installed() -> bool {
    *INTERRUPT_HANDLER.get_or_init(|| {
        ctrlc::set_handler(|| {
            let pending = PENDING_READ.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.as_ref() {
                Some(sender) => {
                    let _ = sender.send(ReadEvent::Interrupted);
                }
                None => std::process::exit(130),
            }
        })
        .inspect_err(|e| debug!("Ctrl-C is not routed to prompts: {e}"))
        .is_ok()
    })
}

/// Run a blocking read on a worker thread so Ctrl-C can end the wait
///
/// An interrupt surfaces as `ErrorKind::Interrupted`; the abandoned reader
/// thread ends with the process.
fn interruptible<F>(read: F) -> io::Result<Option<String>>
where
    F: FnOnce() -> io::Result<Option<String>> + Send + 'static,
{
    if !interrupt_handler_installed() {
        return read();
    }

    let (sender, receiver) = mpsc::channel();
    *PENDING_READ.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender.clone());
    thread::spawn(move || {
        let _ = sender.send(ReadEvent::Line(read()));
    });
    let event = receiver.recv();
    *PENDING_READ.lock().unwrap_or_else(PoisonError::into_inner) = None;

    match event {
        Ok(ReadEvent::Line(line)) => line,
        Ok(ReadEvent::Interrupted) => Err(io::Error::from(io::ErrorKind::Interrupted)),
        Err(_) => Err(io::Error::other("Standard input reader stopped")),
    }
}

fn read_stdin_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(trim_line_end(line)))
}

fn read_password_line() -> io::Result<Option<String>> {
    match rpassword::read_password() {
        Ok(line) => Ok(Some(line)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

impl System for RealSystem {
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        std::env::var(key)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn echo(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        // A closed stdout (e.g. `| head`) is not worth failing a command over
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn echo_err(&self, text: &str) {
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        interruptible(read_stdin_line)
    }

    fn read_hidden_line(&self) -> io::Result<Option<String>> {
        interruptible(read_password_line)
    }

    fn stdin(&self) -> Box<dyn Read> {
        Box::new(io::stdin())
    }

    fn stdout(&self) -> Box<dyn Write> {
        Box::new(io::stdout())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_writable(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|metadata| !metadata.permissions().readonly())
            .unwrap_or(false)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(file))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        let file = fs::File::create(path)?;
        Ok(Box::new(file))
    }

    fn append(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(file))
    }
}
