//! Shared utility functions for EDX crates.

/// Text matching helpers
pub mod text {
    use regex::{Regex, RegexBuilder};

    fn escaped_words(needle: &str) -> String {
        needle
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+")
    }

    /// Build a case-insensitive pattern matching `needle` as a whole word.
    ///
    /// Inner whitespace of multi-word names ("Tamil Nadu") matches any run
    /// of whitespace in the haystack.
    pub fn word_pattern(needle: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&format!(r"\b{}\b", escaped_words(needle)))
            .case_insensitive(true)
            .build()
    }

    /// Like [`word_pattern`], but a digit may follow the name directly ("Kerala2023").
    pub fn name_pattern(needle: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&format!(r"\b{}(?:\b|\d)", escaped_words(needle)))
            .case_insensitive(true)
            .build()
    }

    /// Case-insensitive whole-word containment.
    pub fn contains_word(haystack: &str, needle: &str) -> bool {
        match word_pattern(needle) {
            Ok(re) => re.is_match(haystack),
            Err(_) => false,
        }
    }

    /// Case-insensitive substring containment.
    pub fn contains_ci(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Truncate to at most `max_chars` characters without splitting a char.
    pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
        match s.char_indices().nth(max_chars) {
            Some((idx, _)) => &s[..idx],
            None => s,
        }
    }

}

/// Number formatting helpers
pub mod fmt {
    /// Format a value with two decimals, as shown on chart labels.
    pub fn two_decimals(value: f64) -> String {
        format!("{:.2}", value)
    }

    /// Format a value with three decimals, as used in the reply grammar.
    pub fn three_decimals(value: f64) -> String {
        format!("{:.3}", value)
    }

}
