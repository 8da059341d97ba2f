//! CLI interface tests for the calculator binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn calculator() -> Command {
    let mut cmd = Command::cargo_bin("cordage").unwrap();
    cmd.env_remove("CORDAGE_START")
        .env_remove("CORDAGE_FORMAT")
        .env_remove("CORDAGE_DEFAULTS");
    cmd
}

#[test]
fn test_version_flag() {
    calculator()
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("cordage, version {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    calculator()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Usage: cordage [OPTIONS] COMMAND1 [ARGS]... [COMMAND2 [ARGS]...]...",
        ))
        .stdout(predicate::str::contains("Chained calculator."))
        .stdout(predicate::str::contains("-s, --start FLOAT"))
        .stdout(predicate::str::contains("[default: 0]"))
        .stdout(predicate::str::contains("add  Add the operand."));
}

#[test]
fn test_no_arguments_shows_help() {
    calculator()
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Usage: cordage"));
}

#[test]
fn test_chained_operations() {
    calculator()
        .args(["--start", "1", "add", "2", "mul", "3"])
        .assert()
        .success()
        .stdout("9\n");
}

#[test]
fn test_json_output() {
    calculator()
        .args(["--format", "json", "sub", "4"])
        .assert()
        .success()
        .stdout("{\"result\":-4.0}\n");
}

#[test]
fn test_start_from_environment() {
    calculator()
        .env("CORDAGE_START", "10")
        .args(["div", "4"])
        .assert()
        .success()
        .stdout("2.5\n");
}

#[test]
fn test_divide_by_zero_fails() {
    calculator()
        .args(["div", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Cannot divide by zero"));
}

#[test]
fn test_unknown_command_is_usage_error() {
    calculator()
        .arg("pow")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Try \"cordage --help\" for help."))
        .stderr(predicate::str::contains("Error: No such command \"pow\"."));
}

#[test]
fn test_invalid_operand_is_usage_error() {
    calculator()
        .args(["add", "two"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage: cordage add [OPTIONS] OPERAND"))
        .stderr(predicate::str::contains(
            "Error: Invalid value for \"operand\": two is not a valid floating point value",
        ));
}

#[test]
fn test_invalid_format_choice() {
    calculator()
        .args(["--format", "xml", "add", "1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid choice: xml. (choose from plain, json)"));
}

#[test]
fn test_defaults_file() {
    let temp_dir = TempDir::new().unwrap();
    let defaults_path = temp_dir.path().join("defaults.yaml");
    fs::write(&defaults_path, "start: 5\nformat: json\n").unwrap();

    calculator()
        .env("CORDAGE_DEFAULTS", defaults_path.to_str().unwrap())
        .args(["add", "1"])
        .assert()
        .success()
        .stdout("{\"result\":6.0}\n");
}

#[test]
fn test_missing_defaults_file() {
    calculator()
        .env("CORDAGE_DEFAULTS", "nonexistent.yaml")
        .args(["add", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Default map file not found"));
}
