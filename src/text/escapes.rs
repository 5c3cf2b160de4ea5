//! Escape-aware text helpers
//!
//! Measuring, stripping and cutting raw log text without counting or
//! breaking ANSI control sequences.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// `ESC [ params final-letter`, the same shape the decoder consumes
///
/// The final letter is optional: a sequence cut short by another ESC or by
/// the end of the text is dropped by the decoder, so it is matched here too.
static CSI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[([^A-Za-z\x1b]*)([A-Za-z])?").expect("CSI pattern is valid"));

/// Number of visible characters, escape sequences excluded
pub fn visible_length(text: &str) -> usize {
    if !text.contains('\x1b') {
        return text.chars().count();
    }
    strip_ansi_codes(text).chars().count()
}

/// Remove every escape sequence from `text`
pub fn strip_ansi_codes(text: &str) -> Cow<'_, str> {
    CSI_REGEX.replace_all(text, "")
}

/// SGR sequences still in effect at the end of `text`
///
/// Sequences are collected in order and the list is cleared by a reset
/// (`ESC[0m` or `ESC[m`). The result can be prefixed to following text to
/// resume the same style.
pub fn active_ansi_codes(text: &str) -> String {
    let mut codes: Vec<&str> = Vec::new();

    for caps in CSI_REGEX.captures_iter(text) {
        if caps.get(2).map(|m| m.as_str()) != Some("m") {
            continue;
        }
        match &caps[1] {
            "" | "0" => codes.clear(),
            _ => {
                if let Some(whole) = caps.get(0) {
                    codes.push(whole.as_str());
                }
            }
        }
    }

    codes.concat()
}

/// Byte index of the first visible character past `max_visible`, if any
fn visible_cut_index(text: &str, max_visible: usize) -> Option<usize> {
    let mut sequences = CSI_REGEX.find_iter(text).peekable();
    let mut visible = 0usize;

    for (idx, _) in text.char_indices() {
        while sequences.peek().is_some_and(|seq| seq.end() <= idx) {
            sequences.next();
        }
        if sequences.peek().is_some_and(|seq| seq.start() <= idx) {
            continue;
        }

        visible += 1;
        if visible > max_visible {
            return Some(idx);
        }
    }

    None
}

/// Split `text` after at most `max_visible` visible characters
///
/// Escape sequences are never cut. When a split happens, the SGR codes
/// active at the cut are re-injected at the head of the remainder so it
/// keeps its style. When everything fits, the remainder is empty.
pub fn split_at_visible(text: &str, max_visible: usize) -> (String, String) {
    match visible_cut_index(text, max_visible) {
        None => (text.to_string(), String::new()),
        Some(at) => {
            let (head, tail) = text.split_at(at);
            let mut rest = active_ansi_codes(head);
            rest.push_str(tail);
            (head.to_string(), rest)
        }
    }
}
