//! The dispatch engine: values, parameters, contexts and commands

pub mod command;
pub mod context;
pub mod multi;
pub mod parameter;
pub mod presets;
pub mod value;

pub use command::{Command, CommandBuilder, CommandCallback};
pub use context::{Context, ContextScope, ContextSettings};
pub use multi::{CommandCollection, CommandSource, Group, MultiCommand, ResultCallback};
pub use parameter::{ArgumentBuilder, OptionBuilder, ParamKind, Parameter};
pub use value::{FileHandle, FileMode, RawValue, Value};
