//! Subcommand dispatch tests: groups, chaining, result callbacks,
//! collections and context cleanup

use cordage::types::IntType;
use cordage::{
    CliError, Command, CommandSource, Context, ContextSettings, DefaultMap, Group, MockSystem,
    Parameter, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

type Events = Rc<RefCell<Vec<String>>>;

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn events() -> Events {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(events: &Events, event: &str) {
    events.borrow_mut().push(event.to_owned());
}

fn recorded(events: &Events) -> Vec<String> {
    events.borrow().clone()
}

/// A leaf command that logs its invocation and returns its own name
fn leaf(name: &'static str, log: &Events) -> Command {
    let log = Rc::clone(log);
    Command::new(name)
        .help(&format!("Run {name}."))
        .callback(move |_ctx| {
            push(&log, name);
            Ok(Value::from(name))
        })
        .build()
        .unwrap()
}

/// A leaf command taking one integer argument
fn leaf_with_arg(name: &'static str) -> Command {
    Command::new(name)
        .argument(Parameter::argument("x").param_type(IntType))
        .callback(move |ctx| {
            let x = ctx.param("x").and_then(Value::as_int).unwrap_or_default();
            Ok(Value::from(format!("{name}{x}")))
        })
        .build()
        .unwrap()
}

#[test]
fn test_group_dispatches_to_named_subcommand() {
    let log = events();
    let seen = Rc::clone(&log);
    let cli = Command::group("tool")
        .callback(move |ctx| {
            let sub = ctx.invoked_subcommand().unwrap_or_default();
            push(&seen, &format!("group:{sub}"));
            Ok(Value::Unit)
        })
        .subcommand(leaf("sync", &log))
        .subcommand(leaf("push", &log))
        .build()
        .unwrap();

    let value = cli
        .run(args(&["sync"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("sync"));
    assert_eq!(recorded(&log), vec!["group:sync", "sync"]);
}

#[test]
fn test_subcommand_receives_remaining_tokens() {
    let cli = Command::group("tool")
        .option(Parameter::option(["--debug"]).is_flag(true))
        .subcommand(leaf_with_arg("add"))
        .build()
        .unwrap();
    let value = cli
        .run(args(&["--debug", "add", "5"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("add5"));
}

#[test]
fn test_chain_mode_runs_every_subcommand() {
    let cli = Command::group("tool")
        .chain(true)
        .callback(|ctx| {
            assert_eq!(ctx.invoked_subcommand().as_deref(), Some("*"));
            Ok(Value::Unit)
        })
        .subcommand(leaf_with_arg("a"))
        .subcommand(leaf_with_arg("b"))
        .build()
        .unwrap();

    let value = cli
        .run(args(&["a", "1", "b", "2", "a", "3"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::from("a1"), Value::from("b2"), Value::from("a3")])
    );
}

#[test]
fn test_result_callbacks_compose_in_registration_order() {
    let cli = Command::group("tool")
        .chain(true)
        .subcommand(leaf_with_arg("a"))
        .result_callback(|_ctx, value| {
            let count = value.as_slice().map_or(0, <[Value]>::len);
            Ok(Value::Int(i64::try_from(count).unwrap_or_default()))
        })
        .result_callback(|_ctx, value| {
            Ok(Value::Int(value.as_int().unwrap_or_default() * 10))
        })
        .build()
        .unwrap();

    let value = cli
        .run(args(&["a", "1", "a", "2"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::Int(20));
}

#[test]
fn test_replace_result_callback_drops_earlier_ones() {
    let cli = Command::group("tool")
        .subcommand(leaf_with_arg("a"))
        .result_callback(|_ctx, _value| Ok(Value::from("first")))
        .replace_result_callback(|_ctx, value| Ok(Value::from(format!("replaced {value}"))))
        .build()
        .unwrap();

    let value = cli
        .run(args(&["a", "4"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("replaced a4"));
}

#[test]
fn test_result_callback_sees_group_parameters() {
    let cli = Command::group("tool")
        .option(Parameter::option(["--prefix"]).default("> "))
        .subcommand(leaf_with_arg("a"))
        .result_callback(|ctx, value| {
            let prefix = ctx.param("prefix").and_then(Value::as_str).unwrap_or_default();
            Ok(Value::from(format!("{prefix}{value}")))
        })
        .build()
        .unwrap();

    let value = cli
        .run(args(&["a", "7"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("> a7"));
}

#[test]
fn test_invoke_without_command() {
    let log = events();
    let seen = Rc::clone(&log);
    let cli = Command::group("tool")
        .invoke_without_command(true)
        .callback(move |ctx| {
            push(&seen, &format!("group:{:?}", ctx.invoked_subcommand()));
            Ok(Value::from("own"))
        })
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let value = cli
        .run(args(&[]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("own"));
    assert_eq!(recorded(&log), vec!["group:None"]);
}

#[test]
fn test_invoke_without_command_in_chain_mode() {
    let cli = Command::group("tool")
        .chain(true)
        .invoke_without_command(true)
        .subcommand(leaf_with_arg("a"))
        .result_callback(|_ctx, value| {
            assert_eq!(value, Value::List(Vec::new()));
            Ok(Value::from("empty"))
        })
        .build()
        .unwrap();

    let value = cli
        .run(args(&[]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("empty"));
}

#[test]
fn test_missing_command() {
    let log = events();
    let cli = Command::group("tool")
        .option(Parameter::option(["--debug"]).is_flag(true))
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let system = MockSystem::new();
    let err = cli
        .run(args(&["--debug"]), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing command.");
    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        err.usage_info().unwrap().usage,
        "Usage: tool [OPTIONS] COMMAND [ARGS]..."
    );
}

#[test]
fn test_unknown_command_runs_nothing() {
    let log = events();
    let seen = Rc::clone(&log);
    let cli = Command::group("tool")
        .callback(move |_ctx| {
            push(&seen, "group");
            Ok(Value::Unit)
        })
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let system = MockSystem::new();
    let code = cli.main(args(&["x"]), "tool", &system, ContextSettings::default());
    assert_eq!(code, 2);
    assert!(recorded(&log).is_empty());
    assert_eq!(
        system.captured_stderr(),
        "Usage: tool [OPTIONS] COMMAND [ARGS]...\nTry \"tool --help\" for help.\n\n\
         Error: No such command \"x\".\n"
    );
}

#[test]
fn test_no_args_prints_help() {
    let log = events();
    let cli = Command::group("tool")
        .help("Tool.")
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let system = MockSystem::new();
    let err = cli
        .run(args(&[]), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert!(matches!(err, CliError::Exit { code: 0 }));
    let out = system.captured_stdout();
    assert!(out.starts_with("Usage: tool [OPTIONS] COMMAND [ARGS]..."));
    assert!(out.contains("Commands:\n  sync  Run sync."));
}

#[test]
fn test_no_args_is_help_can_be_disabled() {
    let log = events();
    let cli = Command::group("tool")
        .no_args_is_help(false)
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();
    let err = cli
        .run(args(&[]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing command.");
}

#[test]
fn test_option_like_command_name_still_honors_help() {
    let log = events();
    let cli = Command::group("tool")
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let system = MockSystem::new();
    let err = cli
        .run(args(&["--", "-x", "--help"]), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert!(matches!(err, CliError::Exit { code: 0 }));
    assert!(system.captured_stdout().starts_with("Usage: tool"));
}

#[test]
fn test_option_like_command_name_is_unknown() {
    let log = events();
    let cli = Command::group("tool")
        .invoke_without_command(true)
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let err = cli
        .run(args(&["--", "-x"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "No such command \"-x\".");
}

#[test]
fn test_option_like_command_name_fails_without_help_page() {
    let log = events();
    let cli = Command::group("tool")
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();

    let system = MockSystem::new();
    let err = cli
        .run(args(&["--", "-x"]), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "No such command \"-x\".");
    assert_eq!(system.captured_stdout(), "");

    let code = cli.main(args(&["--", "-x"]), "tool", &system, ContextSettings::default());
    assert_eq!(code, 2);
    assert!(system.captured_stderr().ends_with("Error: No such command \"-x\".\n"));
    assert!(recorded(&log).is_empty());
}

#[test]
fn test_token_normalize_resolves_command_names() {
    let log = events();
    let cli = Command::group("tool")
        .subcommand(leaf("sync", &log))
        .build()
        .unwrap();
    let settings = ContextSettings::new().token_normalize(|token| token.to_lowercase());

    let value = cli
        .run(args(&["SYNC"]), "tool", &MockSystem::new(), settings)
        .unwrap();
    assert_eq!(value, Value::from("sync"));
}

#[test]
fn test_subcommand_registered_under_alias() {
    let log = events();
    let cli = Command::group("tool")
        .subcommand_as("s", leaf("sync", &log))
        .build()
        .unwrap();
    let value = cli
        .run(args(&["s"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("sync"));
}

#[test]
fn test_nested_groups_build_command_path() {
    let inner = Command::group("remote")
        .subcommand(
            Command::new("add")
                .callback(|ctx| Ok(Value::from(ctx.command_path())))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let cli = Command::group("tool").subcommand(inner).build().unwrap();

    let value = cli
        .run(args(&["remote", "add"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("tool remote add"));
}

#[test]
fn test_collection_first_source_wins() {
    let log = events();
    let first = Group::new().with_command(
        Command::new("sync")
            .help("From first.")
            .callback(|_ctx| Ok(Value::from("first")))
            .build()
            .unwrap(),
    );
    let second = Group::new()
        .with_command(
            Command::new("sync")
                .help("From second.")
                .callback(|_ctx| Ok(Value::from("second")))
                .build()
                .unwrap(),
        )
        .with_command(leaf("init", &log));

    let cli = Command::collection("tool")
        .source(first)
        .source(second)
        .build()
        .unwrap();

    let system = MockSystem::new();
    let value = cli
        .run(args(&["sync"]), "tool", &system, ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("first"));

    let value = cli
        .run(args(&["init"]), "tool", &system, ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::from("init"));

    cli.run(args(&["--help"]), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert!(
        system
            .captured_stdout()
            .contains("Commands:\n  init  Run init.\n  sync  From first.")
    );
}

/// Commands computed on lookup
struct Numbered {
    commands: Vec<Command>,
}

impl CommandSource for Numbered {
    fn get_command(&self, _ctx: &Context<'_>, name: &str) -> Option<&Command> {
        let index: usize = name.strip_prefix("cmd")?.parse().ok()?;
        self.commands.get(index)
    }

    fn list_commands(&self, _ctx: &Context<'_>) -> Vec<String> {
        (0..self.commands.len()).map(|i| format!("cmd{i}")).collect()
    }
}

#[test]
fn test_custom_command_source() {
    let commands = (0..3_i64)
        .map(|i| {
            Command::new("numbered")
                .callback(move |_ctx| Ok(Value::Int(i)))
                .build()
                .unwrap()
        })
        .collect();
    let cli = Command::multi_source("tool", Numbered { commands })
        .build()
        .unwrap();

    let value = cli
        .run(args(&["cmd2"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(value, Value::Int(2));

    let err = cli
        .run(args(&["cmd9"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "No such command \"cmd9\".");
}

#[test]
fn test_auto_envvar_prefix_extends_per_subcommand() {
    let cli = Command::group("tool")
        .subcommand(
            Command::new("run")
                .option(Parameter::option(["--level"]).param_type(IntType))
                .callback(|ctx| Ok(ctx.param("level").cloned().unwrap_or(Value::Unit)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let system = MockSystem::new().with_env("TOOL_RUN_LEVEL", "4");
    let settings = ContextSettings::new().auto_envvar_prefix("tool");
    let value = cli.run(args(&["run"]), "tool", &system, settings).unwrap();
    assert_eq!(value, Value::Int(4));
}

#[test]
fn test_default_map_is_narrowed_per_subcommand() {
    let cli = Command::group("tool")
        .option(Parameter::option(["--level"]).param_type(IntType))
        .subcommand(
            Command::new("run")
                .option(Parameter::option(["--level"]).param_type(IntType))
                .callback(|ctx| {
                    let own = ctx.param("level").and_then(Value::as_int).unwrap_or_default();
                    let parent = ctx
                        .parent()
                        .and_then(|p| p.param("level"))
                        .and_then(Value::as_int)
                        .unwrap_or_default();
                    Ok(Value::Tuple(vec![Value::Int(parent), Value::Int(own)]))
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let map = DefaultMap::new()
        .with_value("level", 1_i64)
        .with_nested("run", DefaultMap::new().with_value("level", "2"));
    let settings = ContextSettings::new().default_map(map);

    let value = cli
        .run(args(&["run"]), "tool", &MockSystem::new(), settings)
        .unwrap();
    assert_eq!(value, Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn test_contexts_close_innermost_first_after_results() {
    let log = events();
    let group_log = Rc::clone(&log);
    let child_log = Rc::clone(&log);
    let result_log = Rc::clone(&log);

    let cli = Command::group("tool")
        .callback(move |ctx| {
            push(&group_log, "group");
            let on_close = Rc::clone(&group_log);
            ctx.call_on_close(move || push(&on_close, "close group"));
            Ok(Value::Unit)
        })
        .subcommand(
            Command::new("run")
                .callback(move |ctx| {
                    push(&child_log, "run");
                    let first = Rc::clone(&child_log);
                    let second = Rc::clone(&child_log);
                    ctx.call_on_close(move || push(&first, "close run 1"));
                    ctx.call_on_close(move || push(&second, "close run 2"));
                    Ok(Value::Unit)
                })
                .build()
                .unwrap(),
        )
        .result_callback(move |_ctx, value| {
            push(&result_log, "result");
            Ok(value)
        })
        .build()
        .unwrap();

    cli.run(args(&["run"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(
        recorded(&log),
        vec!["group", "run", "result", "close run 1", "close run 2", "close group"]
    );
}

#[test]
fn test_chain_contexts_close_after_each_command() {
    let log = events();
    let make = |name: &'static str| {
        let log = Rc::clone(&log);
        Command::new(name)
            .callback(move |ctx| {
                push(&log, name);
                let on_close = Rc::clone(&log);
                ctx.call_on_close(move || push(&on_close, &format!("close {name}")));
                Ok(Value::Unit)
            })
            .build()
            .unwrap()
    };
    let cli = Command::group("tool")
        .chain(true)
        .subcommand(make("a"))
        .subcommand(make("b"))
        .build()
        .unwrap();

    cli.run(args(&["a", "b"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap();
    assert_eq!(recorded(&log), vec!["a", "close a", "b", "close b"]);
}

#[test]
fn test_contexts_close_once_when_a_callback_fails() {
    let log = events();
    let group_log = Rc::clone(&log);
    let child_log = Rc::clone(&log);

    let cli = Command::group("tool")
        .callback(move |ctx| {
            let on_close = Rc::clone(&group_log);
            ctx.call_on_close(move || push(&on_close, "close group"));
            Ok(Value::Unit)
        })
        .subcommand(
            Command::new("fail")
                .callback(move |ctx| {
                    let on_close = Rc::clone(&child_log);
                    ctx.call_on_close(move || push(&on_close, "close fail"));
                    Err(ctx.fail("boom"))
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let system = MockSystem::new();
    let code = cli.main(args(&["fail"]), "tool", &system, ContextSettings::default());
    assert_eq!(code, 2);
    assert_eq!(recorded(&log), vec!["close fail", "close group"]);
    assert!(system.captured_stderr().starts_with("Usage: tool fail [OPTIONS]\n"));
    assert!(system.captured_stderr().ends_with("Error: boom\n"));
}

#[test]
fn test_chain_collection_rejects_nested_group_at_dispatch() {
    let log = events();
    let source = Group::new()
        .with_command(leaf("a", &log))
        .with_command(
            Command::group("inner")
                .subcommand(leaf("b", &log))
                .build()
                .unwrap(),
        );
    let cli = Command::collection("tool")
        .chain(true)
        .source(source)
        .build()
        .unwrap();

    let err = cli
        .run(args(&["a", "inner", "b"]), "tool", &MockSystem::new(), ContextSettings::default())
        .unwrap_err();
    assert!(matches!(err, CliError::Declaration { .. }));
    assert!(err.to_string().contains("in chain mode"));
    assert!(recorded(&log).is_empty());
}

#[test]
fn test_chain_group_declaration_checks() {
    let err = Command::group("tool")
        .chain(true)
        .argument(Parameter::argument("x").required(false))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("cannot have optional arguments"));

    let nested = Command::group("inner").build().unwrap();
    let err = Command::group("tool")
        .chain(true)
        .subcommand(nested)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("in chain mode"));

    let err = Command::new("plain").chain(true).build().unwrap_err();
    assert!(matches!(err, CliError::Declaration { .. }));

    let err = Command::new("plain")
        .subcommand(Command::new("x").build().unwrap())
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("does not accept subcommands"));
}
