//! Message text normalization.
//!
//! # Examples
//!
//! ```
//! use sms_spam_detector::analysis::normalize;
//!
//! assert_eq!(normalize("FREE entry!!  Call   now"), "free entry call now");
//! assert_eq!(normalize("!!!"), "");
//! ```

use crate::analysis::char_filter::CharFilter;

/// Normalize a raw message.
///
/// Lowercases, drops every character that is not an ASCII letter, digit or
/// whitespace, collapses whitespace runs to a single space and trims. Letters
/// outside ASCII are dropped rather than transliterated. The function is total
/// and idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        for lower in ch.to_lowercase() {
            if lower.is_ascii_alphanumeric() {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(lower);
            }
        }
    }

    out
}

/// A char filter that applies [`normalize`].
#[derive(Clone, Debug, Default)]
pub struct NormalizeCharFilter;

impl NormalizeCharFilter {
    pub fn new() -> Self {
        NormalizeCharFilter
    }
}

impl CharFilter for NormalizeCharFilter {
    fn filter(&self, input: &str) -> String {
        normalize(input)
    }

    fn name(&self) -> &'static str {
        "normalize"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        assert_eq!(
            normalize("WINNER!! You have won a £1000 prize. Call 09061701461"),
            "winner you have won a 1000 prize call 09061701461"
        );
    }

    #[test]
    fn test_collapses_and_trims_whitespace() {
        assert_eq!(normalize("  hello \t\n  world  "), "hello world");
    }

    #[test]
    fn test_punctuation_between_words_does_not_join_them() {
        // Punctuation is removed but surrounding spaces still separate words.
        assert_eq!(normalize("ok - see you"), "ok see you");
        assert_eq!(normalize("don't"), "dont");
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!... :-)"), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_non_ascii_letters_are_dropped() {
        assert_eq!(normalize("café naïve"), "caf nave");
        assert_eq!(normalize("日本語 text"), "text");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Ur awarded a £2000 Bonus Caller Prize!",
            "  Ok lar... Joking wif u oni...",
            "",
            "ÀÉÎ 123",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_char_filter() {
        let filter = NormalizeCharFilter::new();
        assert_eq!(filter.filter("Hi THERE!"), "hi there");
        assert_eq!(filter.name(), "normalize");
    }
}
