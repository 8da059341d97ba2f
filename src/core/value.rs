//! Raw and resolved parameter values

use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;

/// A resolved, typed value
///
/// Parameters resolve to `Option<Value>`: `None` means absent. Command
/// callbacks return `Value::Unit` when they have nothing to report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Path(PathBuf),
    File(FileHandle),
    /// Fixed-arity values and repeated occurrences
    Tuple(Vec<Value>),
    /// Aggregated command results in chain mode
    List(Vec<Value>),
    Unit,
}

impl Value {
    /// The string payload, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Self::Str(ref s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an integer
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    /// The float payload; integers widen
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Float(f) => Some(f),
            Self::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The path payload, if this is a path
    #[must_use]
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match *self {
            Self::Path(ref p) => Some(p),
            _ => None,
        }
    }

    /// The file handle, if this is a file
    #[must_use]
    pub const fn as_file(&self) -> Option<&FileHandle> {
        match *self {
            Self::File(ref f) => Some(f),
            _ => None,
        }
    }

    /// The elements of a tuple or list
    #[must_use]
    pub fn as_slice(&self) -> Option<&[Value]> {
        match *self {
            Self::Tuple(ref items) | Self::List(ref items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness used for flag defaults
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match *self {
            Self::Str(ref s) => !s.is_empty(),
            Self::Int(i) => i != 0,
            Self::Float(f) => f != 0.0,
            Self::Bool(b) => b,
            Self::Path(ref p) => !p.as_os_str().is_empty(),
            Self::File(_) => true,
            Self::Tuple(ref items) | Self::List(ref items) => !items.is_empty(),
            Self::Unit => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Str(ref s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Path(ref p) => write!(f, "{}", p.display()),
            Self::File(ref handle) => f.write_str(handle.name()),
            Self::Tuple(ref items) | Self::List(ref items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(", "))
            }
            Self::Unit => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A value before type conversion
///
/// Tokens arrive as text; defaults, flag constants and counters may already
/// be typed. Tuples nest once per arity level.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RawValue {
    Text(String),
    Typed(Value),
    Tuple(Vec<RawValue>),
}

impl RawValue {
    /// Truthiness used to pick the default among sibling flags
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match *self {
            Self::Text(ref s) => !s.is_empty(),
            Self::Typed(ref value) => value.is_truthy(),
            Self::Tuple(ref items) => !items.is_empty(),
        }
    }

    /// Whether this is an empty tuple
    #[must_use]
    pub fn is_empty_tuple(&self) -> bool {
        matches!(*self, Self::Tuple(ref items) if items.is_empty())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Text(ref s) => f.write_str(s),
            Self::Typed(ref value) => write!(f, "{value}"),
            Self::Tuple(ref items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Typed(Value::Int(value))
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Typed(Value::Bool(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Typed(Value::Float(value))
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        Self::Typed(value)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(values: Vec<T>) -> Self {
        Self::Tuple(values.into_iter().map(Into::into).collect())
    }
}

/// How a file parameter opens its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FileMode {
    Read,
    Write,
    Append,
}

impl FileMode {
    /// Whether the mode writes
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::Append)
    }
}

enum FileStream {
    Reader(Box<dyn Read>),
    Writer(Box<dyn Write>),
    Closed,
}

/// An opened file bound to a parameter
///
/// The context that converted the value owns the close callback; clones of
/// the handle share the same stream.
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    mode: FileMode,
    stream: Rc<RefCell<FileStream>>,
}

impl FileHandle {
    /// Wrap a readable stream
    #[must_use]
    pub fn reader(name: &str, stream: Box<dyn Read>) -> Self {
        Self {
            name: name.to_owned(),
            mode: FileMode::Read,
            stream: Rc::new(RefCell::new(FileStream::Reader(stream))),
        }
    }

    /// Wrap a writable stream
    #[must_use]
    pub fn writer(name: &str, mode: FileMode, stream: Box<dyn Write>) -> Self {
        Self {
            name: name.to_owned(),
            mode,
            stream: Rc::new(RefCell::new(FileStream::Writer(stream))),
        }
    }

    /// The file name as given on the command line
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mode the file was opened with
    #[must_use]
    pub const fn mode(&self) -> FileMode {
        self.mode
    }

    /// Whether the handle has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(*self.stream.borrow(), FileStream::Closed)
    }

    /// Read the remaining contents
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed, not readable, or reading fails
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut stream = self.stream.borrow_mut();
        match *stream {
            FileStream::Reader(ref mut reader) => {
                let mut buffer = String::new();
                reader.read_to_string(&mut buffer)?;
                Ok(buffer)
            }
            FileStream::Writer(_) => Err(io::Error::other(format!(
                "{} is not open for reading",
                self.name
            ))),
            FileStream::Closed => Err(io::Error::other(format!("{} is closed", self.name))),
        }
    }

    /// Write a string
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed, not writable, or writing fails
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let mut stream = self.stream.borrow_mut();
        match *stream {
            FileStream::Writer(ref mut writer) => writer.write_all(text.as_bytes()),
            FileStream::Reader(_) => Err(io::Error::other(format!(
                "{} is not open for writing",
                self.name
            ))),
            FileStream::Closed => Err(io::Error::other(format!("{} is closed", self.name))),
        }
    }

    /// Flush a writable stream; a no-op for readers
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails
    pub fn flush(&self) -> io::Result<()> {
        if let FileStream::Writer(ref mut writer) = *self.stream.borrow_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flush and release the underlying stream
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        let previous = self.stream.replace(FileStream::Closed);
        if let FileStream::Writer(mut writer) = previous
            && let Err(e) = writer.flush()
        {
            tracing::warn!("Failed to flush {} on close: {e}", self.name);
        }
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.stream, &other.stream)
    }
}

impl Serialize for FileHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}
