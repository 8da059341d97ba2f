//! Small helpers shared by help rendering and the path type

pub mod path;

/// Derive a one-line summary from a command's help text
///
/// Stops at the first sentence end, or at `max_length` columns with a
/// trailing `...`.
#[must_use]
pub fn make_default_short_help(help: &str, max_length: usize) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut total_length = 0;

    for word in help.split_whitespace() {
        let done = word.ends_with('.');
        let new_length = if result.is_empty() {
            word.len()
        } else {
            word.len() + 1
        };

        if total_length + new_length > max_length {
            result.push("...");
            break;
        }

        if !result.is_empty() {
            result.push(" ");
        }
        result.push(word);

        if done {
            break;
        }
        total_length += new_length;
    }

    result.concat()
}
