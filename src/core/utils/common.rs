//! String helpers for the loss and metric registries.
//!
//! Users type loss and metric names by hand, so matching is forgiving about
//! surrounding whitespace and ASCII case but exact about everything else.

use std::fmt;

/// Common string utilities.
#[derive(Debug)]
pub struct Common;

impl Common {
    /// Space, tab, newline, vertical tab, form feed and carriage return.
    #[inline]
    pub const fn is_whitespace(byte: u8) -> bool {
        0x20 == byte || (0x09 <= byte && byte <= 0x0d)
    }

    /// `s` without its leading whitespace.
    pub fn skip_whitespace(s: &str) -> &str {
        let skip = s.bytes().take_while(|&b| Self::is_whitespace(b)).count();
        // whitespace bytes are ASCII, so `skip` is a char boundary
        &s[skip..]
    }

    /// Match `label` at the start of `main`, ignoring leading whitespace and
    /// ASCII case.
    ///
    /// Returns the rest of `main` after the label with its leading whitespace
    /// skipped, or `None` if the label does not match. A registry that wants
    /// an exact name checks that the remainder is empty. Non-ASCII bytes must
    /// match exactly.
    pub fn is_string_equals_case_insensitive<'a>(main: &'a str, label: &str) -> Option<&'a str> {
        let main = Self::skip_whitespace(main);
        let main_bytes = main.as_bytes();
        let label_bytes = label.as_bytes();
        if main_bytes.len() < label_bytes.len() {
            return None;
        }
        let matched = main_bytes
            .iter()
            .zip(label_bytes)
            .all(|(m, l)| m.to_ascii_lowercase() == l.to_ascii_lowercase());
        if !matched {
            return None;
        }
        main.get(label_bytes.len()..).map(Self::skip_whitespace)
    }

    /// True iff `main` is exactly `label` up to whitespace and ASCII case.
    pub fn is_name_match(main: &str, label: &str) -> bool {
        Self::is_string_equals_case_insensitive(main, label).is_some_and(str::is_empty)
    }

    /// Parse a float at the start of `s`.
    ///
    /// Leading whitespace is skipped. The number ends at the next whitespace
    /// byte. Returns the value and the remainder with its leading whitespace
    /// skipped, or `None` if there is no parsable number.
    pub fn convert_string_to_float(s: &str) -> Option<(f64, &str)> {
        let s = Self::skip_whitespace(s);
        let end = s
            .bytes()
            .position(Self::is_whitespace)
            .unwrap_or(s.len());
        if 0 == end {
            return None;
        }
        let value = s[..end].parse::<f64>().ok()?;
        Some((value, Self::skip_whitespace(&s[end..])))
    }

    /// Joins array elements into a string with the specified delimiter.
    pub fn join<T: fmt::Display>(arr: &[T], delimiter: &str) -> String {
        arr.iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_whitespace() {
        assert_eq!(Common::skip_whitespace(" \t\n\x0b\x0c\rabc "), "abc ");
        assert_eq!(Common::skip_whitespace(""), "");
        assert_eq!(Common::skip_whitespace("x"), "x");
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(Common::is_string_equals_case_insensitive("LogLoss", "logloss"), Some(""));
        assert_eq!(Common::is_string_equals_case_insensitive(" logloss ", "logloss"), Some(""));
        assert_eq!(Common::is_string_equals_case_insensitive("LOGLOSS", "LogLoss"), Some(""));
        assert_eq!(Common::is_string_equals_case_insensitive("log_loss", "logloss"), None);
        assert_eq!(Common::is_string_equals_case_insensitive("log", "logloss"), None);
    }

    #[test]
    fn test_match_returns_remainder() {
        assert_eq!(
            Common::is_string_equals_case_insensitive("mse: extra", "mse:"),
            Some("extra")
        );
        assert_eq!(Common::is_string_equals_case_insensitive("msex", "mse"), Some("x"));
        assert!(!Common::is_name_match("msex", "mse"));
        assert!(Common::is_name_match("  MSE\n", "mse"));
    }

    #[test]
    fn test_non_ascii_is_exact() {
        assert_eq!(Common::is_string_equals_case_insensitive("é", "É"), None);
        assert_eq!(Common::is_string_equals_case_insensitive("éx", "é"), Some("x"));
    }

    #[test]
    fn test_convert_string_to_float() {
        assert_eq!(Common::convert_string_to_float("  1.5  "), Some((1.5, "")));
        assert_eq!(Common::convert_string_to_float("-2e3 rest"), Some((-2000.0, "rest")));
        assert_eq!(Common::convert_string_to_float("   "), None);
        assert_eq!(Common::convert_string_to_float("abc"), None);
    }

    #[test]
    fn test_join() {
        assert_eq!(Common::join(&["mse", "logloss"], ", "), "mse, logloss");
        assert_eq!(Common::join::<i32>(&[], ","), "");
    }
}
