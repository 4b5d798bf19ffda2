//! Telegram MarkdownV2 helpers.
//!
//! `bold`, `italic` and `link` wrap text that is already escaped, so callers
//! escape user content once with [`escape`] and compose freely afterwards.

const RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape every MarkdownV2 reserved character.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn bold(escaped: &str) -> String {
    format!("*{escaped}*")
}

pub fn italic(escaped: &str) -> String {
    format!("_{escaped}_")
}

/// Inline link. Inside the URL part only `)` and `\` need escaping.
pub fn link(escaped_text: &str, url: &str) -> String {
    let url = url.replace('\\', "\\\\").replace(')', "\\)");
    format!("[{escaped_text}]({url})")
}

/// Inline code span.
pub fn code(text: &str) -> String {
    let inner = text.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{inner}`")
}
