//! # `Cordage`
//!
//! Demonstration binary for the `cordage` library: a chained calculator.
//! Every subcommand applies one operation to the running value, left to
//! right, and the group prints the final result.
//!
//! ## Usage
//!
//! ```sh
//! cordage --start 1 add 2 mul 3          # 9
//! cordage --format json sub 4            # {"result":-4.0}
//! CORDAGE_START=10 cordage div 4         # 2.5
//! ```
//!
//! Option defaults can also come from `CORDAGE_<OPTION>` variables or from a
//! YAML/JSON default map named by `CORDAGE_DEFAULTS`.

use anyhow::anyhow;
use cordage::types::{Choice, FloatType};
use cordage::{
    Command, ContextSettings, Parameter, RealSystem, System as _, Value,
    load_default_map, presets,
};
use std::path::Path;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn operation(name: &str, help: &str) -> cordage::Result<Command> {
    let op = name.to_owned();
    Command::new(name)
        .help(help)
        .argument(Parameter::argument("operand").param_type(FloatType))
        .callback(move |ctx| {
            let operand = ctx
                .param("operand")
                .and_then(Value::as_float)
                .unwrap_or_default();
            Ok(Value::Tuple(vec![Value::from(op.as_str()), Value::Float(operand)]))
        })
        .build()
}

fn apply(total: f64, step: &Value) -> cordage::Result<f64> {
    let Some([Value::Str(op), Value::Float(operand)]) = step.as_slice() else {
        return Err(anyhow!("Malformed step: {step}").into());
    };
    match op.as_str() {
        "add" => Ok(total + operand),
        "sub" => Ok(total - operand),
        "mul" => Ok(total * operand),
        "div" if *operand == 0.0 => Err(anyhow!("Cannot divide by zero").into()),
        "div" => Ok(total / operand),
        other => Err(anyhow!("Unknown operation: {other}").into()),
    }
}

fn build_cli() -> cordage::Result<Command> {
    Command::group("cordage")
        .help("Chained calculator.\n\nEach command applies one operation to the running value.")
        .chain(true)
        .option(
            Parameter::option(["-s", "--start"])
                .param_type(FloatType)
                .default(0.0_f64)
                .envvar("CORDAGE_START")
                .show_default(true)
                .help("Initial value."),
        )
        .option(
            Parameter::option(["-f", "--format"])
                .param_type(Choice::new(["plain", "json"]))
                .default("plain")
                .help("Output format."),
        )
        .option(presets::version_option(env!("CARGO_PKG_VERSION")))
        .subcommand(operation("add", "Add the operand.")?)
        .subcommand(operation("sub", "Subtract the operand.")?)
        .subcommand(operation("mul", "Multiply by the operand.")?)
        .subcommand(operation("div", "Divide by the operand.")?)
        .result_callback(|ctx, steps| {
            let mut total = ctx
                .param("start")
                .and_then(Value::as_float)
                .unwrap_or_default();
            for step in steps.as_slice().unwrap_or_default() {
                total = apply(total, step)?;
            }

            let line = match ctx.param("format").and_then(Value::as_str) {
                Some("json") => serde_json::json!({ "result": total }).to_string(),
                _ => total.to_string(),
            };
            ctx.system().echo(&format!("{line}\n"));
            Ok(Value::Float(total))
        })
        .build()
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let system = RealSystem::new();

    let cli = match build_cli() {
        Ok(cli) => cli,
        Err(err) => {
            error!("{}", err);
            std::process::exit(err.exit_code());
        }
    };

    let mut settings = ContextSettings::new().auto_envvar_prefix("CORDAGE");
    if let Ok(path) = system.env_var("CORDAGE_DEFAULTS") {
        match load_default_map(&system, Path::new(&path)) {
            Ok(map) => settings = settings.default_map(map),
            Err(err) => {
                system.echo_err(&format!("Error: {err:#}\n"));
                std::process::exit(1);
            }
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(cli.main(args, "cordage", &system, settings));
}
