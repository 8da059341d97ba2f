//! Help page rendering
//!
//! Text is laid out as given; lines are never re-wrapped.

use crate::parser::split_opt;

const INDENT_INCREMENT: usize = 2;
const COL_MAX: usize = 30;
const COL_SPACING: usize = 2;

/// Accumulates usage lines, headings, text and definition lists
#[derive(Debug, Default)]
pub struct HelpFormatter {
    current_indent: usize,
    buffer: String,
}

impl HelpFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pad(&mut self, width: usize) {
        self.buffer.extend(std::iter::repeat_n(' ', width));
    }

    /// `Usage: <prog> <args>`
    pub fn write_usage(&mut self, prog: &str, args: &str) {
        self.pad(self.current_indent);
        self.buffer.push_str("Usage: ");
        self.buffer.push_str(prog);
        if !args.is_empty() {
            self.buffer.push(' ');
            self.buffer.push_str(args);
        }
        self.buffer.push('\n');
    }

    /// `<heading>:` at the current indentation
    pub fn write_heading(&mut self, heading: &str) {
        self.pad(self.current_indent);
        self.buffer.push_str(heading);
        self.buffer.push_str(":\n");
    }

    /// Blank line, unless nothing was written yet
    pub fn write_paragraph(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
    }

    /// Every line of `text` at the current indentation
    pub fn write_text(&mut self, text: &str) {
        for line in text.lines() {
            if !line.trim().is_empty() {
                self.pad(self.current_indent);
                self.buffer.push_str(line.trim_end());
            }
            self.buffer.push('\n');
        }
    }

    /// Two-column definition list
    ///
    /// The first column is at most 30 characters wide; longer terms push
    /// their definition to the next line.
    pub fn write_dl(&mut self, rows: &[(String, String)]) {
        let widest = rows
            .iter()
            .map(|(term, _)| term.chars().count())
            .max()
            .unwrap_or_default();
        let first_col = widest.min(COL_MAX) + COL_SPACING;

        for (term, definition) in rows {
            self.pad(self.current_indent);
            self.buffer.push_str(term);

            let mut lines = definition.lines();
            let Some(first_line) = lines.next() else {
                self.buffer.push('\n');
                continue;
            };

            let term_width = term.chars().count();
            if term_width <= first_col - COL_SPACING {
                self.pad(first_col - term_width);
            } else {
                self.buffer.push('\n');
                self.pad(first_col + self.current_indent);
            }
            self.buffer.push_str(first_line);
            self.buffer.push('\n');

            for line in lines {
                self.pad(first_col + self.current_indent);
                self.buffer.push_str(line);
                self.buffer.push('\n');
            }
        }
    }

    /// Run `f` one indentation level deeper
    pub fn indented<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.current_indent += INDENT_INCREMENT;
        f(self);
        self.current_indent -= INDENT_INCREMENT;
    }

    /// Paragraph break, heading, then `f` indented under it
    pub fn section<F: FnOnce(&mut Self)>(&mut self, name: &str, f: F) {
        self.write_paragraph();
        self.write_heading(name);
        self.indented(f);
    }

    /// The rendered text without trailing newlines
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer.trim_end_matches('\n').to_owned()
    }
}

/// Join option tokens, shortest prefix first
///
/// Also reports whether any token uses the `/` prefix, which switches the
/// separator between primary and secondary tokens to `; `.
#[must_use]
pub fn join_options(options: &[String]) -> (String, bool) {
    let mut any_prefix_is_slash = false;
    let mut ranked: Vec<(usize, &str)> = options
        .iter()
        .map(|opt| {
            let prefix = split_opt(opt).0;
            any_prefix_is_slash |= prefix == "/";
            (prefix.len(), opt.as_str())
        })
        .collect();
    ranked.sort_by_key(|&(len, _)| len);

    let joined = ranked
        .into_iter()
        .map(|(_, opt)| opt)
        .collect::<Vec<_>>()
        .join(", ");
    (joined, any_prefix_is_slash)
}
