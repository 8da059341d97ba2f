//! Ready-made options: help, version, confirmation and password

use crate::core::parameter::{OptionBuilder, Parameter};
use crate::core::value::Value;

fn flag_is_set(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_truthy)
}

/// Eager flag that prints the help page and exits
///
/// Added to every command automatically unless disabled; `names` are the
/// context's help option names.
pub fn help_option<I, S>(names: I) -> OptionBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Parameter::option(names)
        .is_flag(true)
        .expose_value(false)
        .eager(true)
        .help("Show this message and exit.")
        .callback(|ctx, _param, value| {
            if !flag_is_set(value.as_ref()) || ctx.resilient_parsing() {
                return Ok(value);
            }
            ctx.system().echo(&format!("{}\n", ctx.get_help()));
            Err(ctx.exit(0))
        })
}

/// Eager `--version` flag printing `<prog>, version <version>`
///
/// The program name is the invocation name of the root context.
pub fn version_option(version: &str) -> OptionBuilder {
    let version = version.to_owned();
    Parameter::option(["--version"])
        .is_flag(true)
        .expose_value(false)
        .eager(true)
        .help("Show the version and exit.")
        .callback(move |ctx, _param, value| {
            if !flag_is_set(value.as_ref()) || ctx.resilient_parsing() {
                return Ok(value);
            }
            let prog = ctx.find_root().info_name().unwrap_or_default();
            ctx.system().echo(&format!("{prog}, version {version}\n"));
            Err(ctx.exit(0))
        })
}

/// `--yes` flag; prompts when absent and aborts on a declined answer
pub fn confirmation_option() -> OptionBuilder {
    Parameter::option(["--yes"])
        .is_flag(true)
        .expose_value(false)
        .prompt("Do you want to continue?")
        .help("Confirm the action without prompting.")
        .callback(|ctx, _param, value| {
            if flag_is_set(value.as_ref()) {
                Ok(value)
            } else {
                Err(ctx.abort())
            }
        })
}

/// `--password` option prompted with hidden input and confirmation
pub fn password_option() -> OptionBuilder {
    Parameter::option(["--password"])
        .prompt_auto()
        .confirmation_prompt(true)
        .hide_input(true)
}
