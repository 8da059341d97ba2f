//! `Cordage` - declarative command-line interfaces
//!
//! Commands are built from typed options and arguments, nested into groups
//! or chained, and dispatched against a token list. Values come from the
//! command line, a default map, environment variables, interactive prompts
//! or declared defaults, in that order.
//!
//! ```no_run
//! use cordage::{Command, ContextSettings, Parameter, RealSystem, Value};
//!
//! # fn main() -> cordage::Result<()> {
//! let hello = Command::new("hello")
//!     .option(Parameter::option(["--name"]).default("world"))
//!     .callback(|ctx| {
//!         let name = ctx.param("name").and_then(Value::as_str).unwrap_or_default();
//!         ctx.system().echo(&format!("Hello {name}!\n"));
//!         Ok(Value::Unit)
//!     })
//!     .build()?;
//!
//! let args: Vec<String> = std::env::args().skip(1).collect();
//! std::process::exit(hello.main(args, "hello", &RealSystem, ContextSettings::default()));
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod core;
pub mod error;
pub mod formatting;
pub mod parser;
pub mod system;
pub mod termui;
pub mod types;
pub mod utils;

pub use crate::core::{
    ArgumentBuilder, Command, CommandBuilder, CommandCollection, CommandSource, Context,
    ContextSettings, FileHandle, FileMode, Group, OptionBuilder, Parameter, RawValue, Value,
    presets,
};
pub use config::{DefaultMap, load_default_map};
pub use error::{CliError, Result};
pub use system::{MockSystem, RealSystem, System};
