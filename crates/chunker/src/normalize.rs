//! Whitespace canonicalization and paragraph splitting.

use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("horizontal space pattern"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{2,}").expect("paragraph break pattern"));

/// Canonicalize line endings to `\n`, collapse runs of spaces/tabs to a single
/// space and trim the ends. Newlines themselves are kept so paragraph breaks
/// survive.
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    HORIZONTAL_SPACE.replace_all(&unix, " ").trim().to_string()
}

/// Split normalized text on runs of two or more newlines. Blocks are trimmed
/// and empty ones dropped.
pub fn split_blocks(normalized: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(normalized)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect()
}

/// Length in chars, the unit every size bound is expressed in.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Longest prefix of `s` holding at most `n` chars.
pub(crate) fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Longest suffix of `s` holding at most `n` chars.
pub(crate) fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
