//! Help page and usage line rendering tests

use cordage::types::{Choice, IntType};
use cordage::{CliError, Command, ContextSettings, MockSystem, Parameter, Value};

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Run with `tokens` and return the printed help page
fn help_output(command: &Command, tokens: &[&str]) -> String {
    let system = MockSystem::new();
    let err = command
        .run(args(tokens), "tool", &system, ContextSettings::default())
        .unwrap_err();
    assert!(matches!(err, CliError::Exit { code: 0 }));
    system.captured_stdout()
}

#[test]
fn test_command_help_page() {
    let command = Command::new("greet")
        .help("Greet someone.\n\nLonger text.")
        .epilog("See docs.")
        .option(
            Parameter::option(["-n", "--name"])
                .required(true)
                .help("Who to greet."),
        )
        .option(
            Parameter::option(["--count"])
                .param_type(IntType)
                .default(1_i64)
                .show_default(true)
                .help("Repetitions."),
        )
        .argument(Parameter::argument("target"))
        .build()
        .unwrap();

    assert_eq!(
        help_output(&command, &["--help"]),
        "Usage: tool [OPTIONS] TARGET\n\
         \n  Greet someone.\n\
         \n  Longer text.\n\
         \nOptions:\n\
         \x20 -n, --name TEXT  Who to greet.  [required]\n\
         \x20 --count INTEGER  Repetitions.  [default: 1]\n\
         \x20 --help           Show this message and exit.\n\
         \n  See docs.\n"
    );
}

#[test]
fn test_group_help_lists_visible_commands() {
    let command = Command::group("tool")
        .help("Tool.")
        .subcommand(
            Command::new("init")
                .help("Create a project. Then explain at length.")
                .build()
                .unwrap(),
        )
        .subcommand(Command::new("secret").help("Hidden.").hidden(true).build().unwrap())
        .subcommand(Command::new("sync").short_help("Sync now").build().unwrap())
        .build()
        .unwrap();

    assert_eq!(
        help_output(&command, &["--help"]),
        "Usage: tool [OPTIONS] COMMAND [ARGS]...\n\
         \n  Tool.\n\
         \nOptions:\n\
         \x20 --help  Show this message and exit.\n\
         \nCommands:\n\
         \x20 init  Create a project.\n\
         \x20 sync  Sync now\n"
    );
}

#[test]
fn test_subcommand_help_uses_command_path() {
    let command = Command::group("tool")
        .subcommand(
            Command::new("init")
                .argument(Parameter::argument("dir").required(false))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let out = help_output(&command, &["init", "--help"]);
    assert!(out.starts_with("Usage: tool init [OPTIONS] [DIR]\n"));
}

#[test]
fn test_flag_and_metavar_rendering() {
    let command = Command::new("tool")
        .option(Parameter::option(["--shout/--no-shout"]).help("Shout."))
        .option(Parameter::option(["/debug;/no-debug"]))
        .option(
            Parameter::option(["--mode"])
                .param_type(Choice::new(["fast", "slow"])),
        )
        .option(Parameter::option(["--point"]).nargs(2).metavar("X Y"))
        .option(Parameter::option(["--size"]).nargs(2).param_type(IntType))
        .option(Parameter::option(["-v"]).count(true))
        .option(Parameter::option(["--internal"]).hidden(true))
        .build()
        .unwrap();

    let out = help_output(&command, &["--help"]);
    assert!(out.contains("  --shout / --no-shout  Shout.\n"));
    assert!(out.contains("  /debug; /no-debug\n"));
    assert!(out.contains("  --mode [fast|slow]\n"));
    assert!(out.contains("  --point X Y\n"));
    assert!(out.contains("  --size INTEGER...\n"));
    assert!(out.contains("  -v\n"));
    assert!(!out.contains("--internal"));
}

#[test]
fn test_custom_usage_metavars() {
    let command = Command::group("tool")
        .options_metavar("[FLAGS]")
        .subcommand_metavar("ACTION")
        .argument(Parameter::argument("env").metavar("ENVIRONMENT"))
        .subcommand(Command::new("run").build().unwrap())
        .build()
        .unwrap();

    let system = MockSystem::new();
    let ctx = command
        .make_context(
            "tool",
            args(&["prod", "run"]),
            &system,
            ContextSettings::default(),
        )
        .unwrap();
    assert_eq!(ctx.get_usage(), "Usage: tool [FLAGS] ENVIRONMENT ACTION");
    assert_eq!(ctx.param("env"), Some(&Value::from("prod")));
}

#[test]
fn test_chain_usage_line() {
    let command = Command::group("tool")
        .chain(true)
        .subcommand(Command::new("a").build().unwrap())
        .build()
        .unwrap();
    let out = help_output(&command, &[]);
    assert!(out.starts_with("Usage: tool [OPTIONS] COMMAND1 [ARGS]... [COMMAND2 [ARGS]...]...\n"));
}
