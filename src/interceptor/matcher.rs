// SPDX-License-Identifier: Apache-2.0

//! Sentinel Matcher
//!
//! Decides whether a column's text trips the sentinel.

/// Returns true if `column_text` begins with `marker`.
///
/// This is a byte-wise prefix comparison with no case folding or
/// normalization: `"SENTINELA"` matches the marker `"SENTINEL"`. NULL
/// column values never match.
pub fn matches(column_text: Option<&str>, marker: &str) -> bool {
    match column_text {
        Some(text) => text.as_bytes().starts_with(marker.as_bytes()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_value_matches() {
        assert!(matches(Some("SENTINEL"), "SENTINEL"));
    }

    #[test]
    fn test_prefix_matches() {
        assert!(matches(Some("SENTINELA"), "SENTINEL"));
        assert!(matches(Some("SENTINEL-X"), "SENTINEL"));
    }

    #[test]
    fn test_null_never_matches() {
        assert!(!matches(None, "SENTINEL"));
    }

    #[test]
    fn test_no_case_folding() {
        assert!(!matches(Some("sentinel"), "SENTINEL"));
    }

    #[test]
    fn test_shorter_text_does_not_match() {
        assert!(!matches(Some("SENTI"), "SENTINEL"));
        assert!(!matches(Some(""), "SENTINEL"));
    }

    #[test]
    fn test_marker_must_lead() {
        assert!(!matches(Some("X-SENTINEL"), "SENTINEL"));
    }

    proptest! {
        #[test]
        fn any_suffix_after_marker_matches(suffix in ".*") {
            let text = format!("SENTINEL{}", suffix);
            prop_assert!(matches(Some(&text), "SENTINEL"));
        }

        #[test]
        fn text_without_marker_prefix_never_matches(text in "[a-z0-9 ]{0,32}") {
            prop_assert!(!matches(Some(&text), "SENTINEL"));
        }
    }
}
