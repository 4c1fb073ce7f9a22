//! # Question Normalization
//!
//! Every question is folded into one canonical form before it is used as a cache
//! key or handed to the intent matchers. Entity pre-extraction (phone, email)
//! also lives here since it runs on that same canonical text.

use regex::Regex;
use std::sync::LazyLock;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{7,12}").expect("phone regex is valid"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").expect("email regex is valid")
});

const TERMINAL_PUNCTUATION: &[char] = &['!', '?', '.', ',', ';', ':'];

/// Lowercases, collapses whitespace and strips trailing punctuation.
///
/// Two questions that differ only in case, spacing or terminal punctuation
/// normalize to the same string, and `normalize(normalize(q)) == normalize(q)`.
pub fn normalize(question: &str) -> String {
    let collapsed = question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .trim_end_matches(|c: char| TERMINAL_PUNCTUATION.contains(&c) || c.is_whitespace())
        .to_string()
}

/// Drops the punctuation that commonly decorates small talk ("Hi!", "thanks, bye").
pub fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '!' | '?' | '.' | ','))
        .collect::<String>()
        .trim()
        .to_string()
}

/// The first run of 7 to 12 digits, treated as a phone number.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE.find(text).map(|m| m.as_str().to_string())
}

/// The first email-looking token.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_whitespace_and_terminal_punctuation() {
        assert_eq!(normalize("  Low   STOCK?! "), "low stock");
        assert_eq!(normalize("low stock"), normalize("LOW stock."));
        assert_eq!(normalize("hi . ?"), "hi");
    }

    #[test]
    fn normalization_is_idempotent() {
        for q in [
            "Customer  Ravi details.",
            "hi . ?",
            "  WHO purchased Kisses??",
            "sales from 12-11-2024 to 15-12-2024",
            "",
        ] {
            let once = normalize(q);
            assert_eq!(normalize(&once), once, "not idempotent for {q:?}");
        }
    }

    #[test]
    fn extracts_phone_and_email() {
        assert_eq!(
            extract_phone("customer 9876543210 details"),
            Some("9876543210".to_string())
        );
        assert_eq!(extract_phone("customer 12345 details"), None);
        assert_eq!(
            extract_email("supplier sales@acme-foods.co.in."),
            Some("sales@acme-foods.co.in".to_string())
        );
        assert_eq!(extract_email("supplier acme"), None);
    }

    #[test]
    fn strips_small_talk_punctuation() {
        assert_eq!(strip_punctuation("hi, there!"), "hi there");
    }
}
