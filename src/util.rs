// src/util.rs - Log-safe string helpers

use std::borrow::Cow;

/// Longest prefix of `s` that fits in `max_len` bytes without splitting a
/// UTF-8 character.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Single-line preview of user input for log lines. Newlines are flattened
/// and a trailing `...` marks truncation.
pub fn preview(s: &str, max_len: usize) -> Cow<'_, str> {
    let cut = truncate_str(s, max_len);
    let flat = if cut.contains(['\r', '\n']) {
        Cow::Owned(cut.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(cut)
    };
    if cut.len() < s.len() {
        Cow::Owned(format!("{flat}..."))
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "Master’s": the apostrophe is 3 bytes, cutting inside it backs off.
        assert_eq!(truncate_str("Master’s", 7), "Master");
    }

    #[test]
    fn test_truncate_zero_max() {
        assert_eq!(truncate_str("hello", 0), "");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("scholarship", 6), "schola...");
        assert_eq!(preview("daad", 10), "daad");
    }

    #[test]
    fn test_preview_flattens_newlines() {
        assert_eq!(preview("line one\nline two", 100), "line one line two");
        assert_eq!(preview("line one\rline two", 100), "line one line two");
    }
}
