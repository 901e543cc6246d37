//! Markup escaping
//!
//! Carriage returns are written as `&#13;`: the tokenizer folds a literal
//! `\r` into `\n`, while the character reference survives as U+000D.

use std::borrow::Cow;

fn escape_with(input: &str, quote: bool) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>' | '\r') || (quote && c == '"');
    if !input.contains(needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '"' if quote => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape text content
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape_with(input, false)
}

/// Escape a double-quoted attribute value
pub fn escape_attr(input: &str) -> Cow<'_, str> {
    escape_with(input, true)
}
