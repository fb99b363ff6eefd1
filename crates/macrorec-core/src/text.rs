//! Char-offset string utilities.
//!
//! Macro offsets count Unicode scalar values, not bytes. Rust `&str[..n]`
//! panics when `n` falls inside a multi-byte character, so every offset is
//! translated through these helpers before slicing.

/// Number of chars in `s`.
#[inline]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the char at `char_idx`.
///
/// `char_idx == char_len(s)` maps to `s.len()`. Returns `None` past the end.
pub fn byte_index(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    match s.char_indices().nth(char_idx) {
        Some((byte, _)) => Some(byte),
        None => (char_len(s) == char_idx).then_some(s.len()),
    }
}

/// Slice `s` by char offsets `[start, end)`.
pub fn char_slice(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let from = byte_index(s, start)?;
    let to = byte_index(s, end)?;
    Some(&s[from..to])
}

/// Slice `s` from char offset `start` taking at most `count` chars.
///
/// Unlike [`char_slice`], a range running past the end is clamped.
pub fn char_slice_clamped(s: &str, start: usize, count: usize) -> &str {
    let from = byte_index(s, start).unwrap_or(s.len());
    let rest = &s[from..];
    let to = byte_index(rest, count).unwrap_or(rest.len());
    &rest[..to]
}

/// Replace `removed` chars at char offset `start` with `inserted`.
///
/// Returns `false` (leaving `text` untouched) if the range is out of bounds.
pub fn splice(text: &mut String, start: usize, removed: usize, inserted: &str) -> bool {
    let Some(from) = byte_index(text, start) else {
        return false;
    };
    let Some(len) = byte_index(&text[from..], removed) else {
        return false;
    };
    text.replace_range(from..from + len, inserted);
    true
}

/// Keep only the first `count` chars of `s`.
pub fn truncate_chars(s: &mut String, count: usize) {
    if let Some(end) = byte_index(s, count) {
        s.truncate(end);
    }
}

/// Byte length of the longest common prefix of `a` and `b`, on a char boundary.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Byte length of the longest common suffix of `a` and `b`, on a char boundary.
pub fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
