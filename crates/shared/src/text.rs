//! Text normalization helpers.

/// Normalizes a configured phrase for case-insensitive substring matching.
///
/// Trims surrounding whitespace and lower-cases. Interior whitespace is kept
/// as-is so multi-word phrases match exactly as written.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

/// Shortens text for log fields, appending an ellipsis when cut.
///
/// Cuts on a character boundary, never inside a multi-byte sequence.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("  Watch Out "), "watch out");
        assert_eq!(normalize_phrase("FIRE"), "fire");
        assert_eq!(normalize_phrase(""), "");
    }

    #[test]
    fn test_truncate_for_log_short_text_untouched() {
        assert_eq!(truncate_for_log("door ahead", 80), "door ahead");
    }

    #[test]
    fn test_truncate_for_log_cuts_on_char_boundary() {
        assert_eq!(truncate_for_log("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_for_log("abc", 3), "abc");
    }
}
