//! Parameter type tests: choices, ranges, paths and files

use cordage::types::{Choice, FileType, FloatType, IntRange, PathType};
use cordage::{
    ArgumentBuilder, Command, ContextSettings, FileMode, MockSystem, Parameter, Value,
};
use std::path::PathBuf;

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// A command with one argument that returns its converted value
fn echo_command(argument: ArgumentBuilder) -> Command {
    Command::new("tool")
        .argument(argument)
        .callback(|ctx| Ok(ctx.param("value").cloned().unwrap_or(Value::Unit)))
        .build()
        .unwrap()
}

fn convert(command: &Command, system: &MockSystem, token: &str) -> cordage::Result<Value> {
    command.run(args(&[token]), "tool", system, ContextSettings::default())
}

#[test]
fn test_choice_accepts_declared_values() {
    let command = echo_command(
        Parameter::argument("value").param_type(Choice::new(["read", "write"])),
    );
    let system = MockSystem::new();
    assert_eq!(convert(&command, &system, "read").unwrap(), Value::from("read"));

    let err = convert(&command, &system, "READ").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid value for \"value\": invalid choice: READ. (choose from read, write)"
    );
}

#[test]
fn test_choice_case_insensitive_returns_declared_spelling() {
    let command = echo_command(
        Parameter::argument("value")
            .param_type(Choice::new(["Read", "Write"]).case_sensitive(false)),
    );
    assert_eq!(
        convert(&command, &MockSystem::new(), "wRiTe").unwrap(),
        Value::from("Write")
    );
}

#[test]
fn test_choice_applies_token_normalizer() {
    let command = echo_command(
        Parameter::argument("value").param_type(Choice::new(["dry_run", "apply"])),
    );
    let settings = ContextSettings::new().token_normalize(|token| token.replace('-', "_"));
    let value = command
        .run(args(&["dry-run"]), "tool", &MockSystem::new(), settings)
        .unwrap();
    assert_eq!(value, Value::from("dry_run"));
}

#[test]
fn test_int_range_bounds() {
    let command = echo_command(
        Parameter::argument("value").param_type(IntRange::new().min(1).max(5)),
    );
    let system = MockSystem::new();
    assert_eq!(convert(&command, &system, "3").unwrap(), Value::Int(3));

    let err = convert(&command, &system, "9").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid value for \"value\": 9 is not in the valid range of 1 to 5."
    );

    let only_min = echo_command(Parameter::argument("value").param_type(IntRange::new().min(0)));
    let err = only_min
        .run(args(&["--", "-2"]), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert!(err.to_string().ends_with("-2 is smaller than the minimum valid value 0."));
}

#[test]
fn test_int_range_clamps() {
    let command = echo_command(
        Parameter::argument("value").param_type(IntRange::new().min(0).max(10).clamp(true)),
    );
    let system = MockSystem::new();
    assert_eq!(convert(&command, &system, "42").unwrap(), Value::Int(10));
    let value = command
        .run(args(&["--", "-1"]), "tool", &system, ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::Int(0));
}

#[test]
fn test_float_type() {
    let command = echo_command(Parameter::argument("value").param_type(FloatType));
    let system = MockSystem::new();
    assert_eq!(convert(&command, &system, "2.5").unwrap(), Value::Float(2.5));

    let err = convert(&command, &system, "half").unwrap_err();
    assert!(err.to_string().ends_with("half is not a valid floating point value"));
}

#[test]
fn test_path_existence_checks() {
    let system = MockSystem::new()
        .with_file("/data/input.txt", b"hello")
        .with_dir("/data/out");

    let must_exist = echo_command(Parameter::argument("value").param_type(PathType::new().exists(true)));
    assert_eq!(
        convert(&must_exist, &system, "/data/input.txt").unwrap(),
        Value::Path(PathBuf::from("/data/input.txt"))
    );
    let err = convert(&must_exist, &system, "/data/missing.txt").unwrap_err();
    assert!(err.to_string().ends_with("Path \"/data/missing.txt\" does not exist."));

    let anything = echo_command(Parameter::argument("value").param_type(PathType::new()));
    assert_eq!(
        convert(&anything, &system, "/nowhere").unwrap(),
        Value::Path(PathBuf::from("/nowhere"))
    );
}

#[test]
fn test_path_kind_checks() {
    let system = MockSystem::new()
        .with_file("/data/input.txt", b"hello")
        .with_dir("/data/out");

    let dirs_only = echo_command(
        Parameter::argument("value").param_type(PathType::new().file_okay(false)),
    );
    let err = convert(&dirs_only, &system, "/data/input.txt").unwrap_err();
    assert!(err.to_string().ends_with("Directory \"/data/input.txt\" is a file."));

    let files_only = echo_command(
        Parameter::argument("value").param_type(PathType::new().dir_okay(false)),
    );
    let err = convert(&files_only, &system, "/data/out").unwrap_err();
    assert!(err.to_string().ends_with("File \"/data/out\" is a directory."));
}

#[test]
fn test_path_writable_check() {
    let system = MockSystem::new()
        .with_file("/data/locked.txt", b"")
        .with_readonly("/data/locked.txt");
    let command = echo_command(
        Parameter::argument("value").param_type(PathType::new().writable(true)),
    );
    let err = convert(&command, &system, "/data/locked.txt").unwrap_err();
    assert!(err.to_string().ends_with("Path \"/data/locked.txt\" is not writable."));
}

#[test]
fn test_path_resolution_and_home_expansion() {
    let system = MockSystem::new()
        .with_current_dir("/work")
        .with_home_dir("/home/ann")
        .with_dir("/work/src");

    let resolved = echo_command(
        Parameter::argument("value").param_type(PathType::new().resolve_path(true)),
    );
    assert_eq!(
        convert(&resolved, &system, "src/../src").unwrap(),
        Value::Path(PathBuf::from("/work/src"))
    );

    let expanded = echo_command(
        Parameter::argument("value").param_type(PathType::new().expand_user(true)),
    );
    assert_eq!(
        convert(&expanded, &system, "~/notes").unwrap(),
        Value::Path(PathBuf::from("/home/ann/notes"))
    );
}

#[test]
fn test_path_dash() {
    let command = echo_command(
        Parameter::argument("value").param_type(PathType::new().exists(true).allow_dash(true)),
    );
    assert_eq!(
        convert(&command, &MockSystem::new(), "-").unwrap(),
        Value::Path(PathBuf::from("-"))
    );
}

#[test]
fn test_file_read() {
    let system = MockSystem::new().with_file("/in.txt", b"line one\n");
    let command = Command::new("cat")
        .argument(Parameter::argument("src").param_type(FileType::new(FileMode::Read)))
        .callback(|ctx| {
            let Some(file) = ctx.param("src").and_then(Value::as_file) else {
                return Err(ctx.fail("no file"));
            };
            let text = file.read_to_string().map_err(anyhow::Error::from)?;
            Ok(Value::from(text))
        })
        .build()
        .unwrap();

    let value = command
        .run(args(&["/in.txt"]), "cat", &system, ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("line one\n"));

    let err = command
        .run(args(&["/missing.txt"]), "cat", &system, ContextSettings::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid value for \"src\": Could not open file: /missing.txt: No such file or directory"
    );
}

#[test]
fn test_file_write_is_flushed_when_context_closes() {
    let system = MockSystem::new().with_dir("/out");
    let command = Command::new("write")
        .argument(Parameter::argument("dst").param_type(FileType::new(FileMode::Write)))
        .callback(|ctx| {
            if let Some(file) = ctx.param("dst").and_then(Value::as_file) {
                file.write_str("written").map_err(anyhow::Error::from)?;
                assert!(!file.is_closed());
            }
            Ok(ctx.param("dst").cloned().unwrap_or(Value::Unit))
        })
        .build()
        .unwrap();

    let value = command
        .run(args(&["/out/result.txt"]), "write", &system, ContextSettings::default())
        .unwrap();
    assert_eq!(system.file_contents("/out/result.txt").as_deref(), Some("written"));
    assert!(value.as_file().is_some_and(cordage::FileHandle::is_closed));
}

#[test]
fn test_file_dash_uses_standard_streams() {
    let system = MockSystem::new().with_input(["from stdin"]);
    let command = Command::new("copy")
        .argument(Parameter::argument("src").param_type(FileType::new(FileMode::Read)))
        .argument(Parameter::argument("dst").param_type(FileType::new(FileMode::Write)))
        .callback(|ctx| {
            let src = ctx.param("src").and_then(Value::as_file);
            let dst = ctx.param("dst").and_then(Value::as_file);
            if let (Some(src), Some(dst)) = (src, dst) {
                let text = src.read_to_string().map_err(anyhow::Error::from)?;
                dst.write_str(&text.to_uppercase()).map_err(anyhow::Error::from)?;
            }
            Ok(Value::Unit)
        })
        .build()
        .unwrap();

    command
        .run(args(&["-", "-"]), "copy", &system, ContextSettings::default())
        .unwrap();
    assert_eq!(system.captured_stdout(), "FROM STDIN\n");
}
