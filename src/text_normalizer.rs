use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00a0}\u{000b}\u{000c}]+").unwrap());
static SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").unwrap());
static BLANK_LINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Canonicalizes extracted text: NBSP becomes a space, line endings become `\n`,
/// horizontal whitespace runs collapse to one space, three or more line breaks
/// collapse to a single blank line, and the result is trimmed.
///
/// Total and idempotent.
pub fn normalize(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINE_RUN.replace_all(&text, "\n\n");
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_string()
}
