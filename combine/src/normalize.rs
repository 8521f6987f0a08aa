//! Media-condition normalization.
//!
//! Two helpers drive everything downstream: [`normalized_key`] is the merge
//! identity and [`extract_numeric`] yields the breakpoints used for sorting.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

/// Strips every character outside `[A-Za-z0-9]`, preserving case.
///
/// Conditions with equal keys are merged, so whitespace, punctuation and
/// parenthesization differences never split a group.
///
/// # Examples
///
/// ```
/// use cmq_combine::normalize::normalized_key;
///
/// assert_eq!(normalized_key("(min-width: 768px)"), "minwidth768px");
/// assert_eq!(normalized_key("( min-width:768px )"), normalized_key("(min-width: 768px)"));
/// assert_ne!(normalized_key("Print"), normalized_key("print"));
/// ```
pub fn normalized_key(condition: &str) -> String {
    condition
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

/// Extracts every numeric token (`768`, `1.5`, `.5`) in textual order.
///
/// # Examples
///
/// ```
/// use cmq_combine::normalize::extract_numeric;
///
/// assert_eq!(extract_numeric("(min-width: 48em)"), vec![48.0]);
/// assert_eq!(extract_numeric("(min-width: 320px) and (max-width: 767.5px)"), vec![320.0, 767.5]);
/// assert!(extract_numeric("print").is_empty());
/// ```
pub fn extract_numeric(condition: &str) -> Vec<f64> {
    // SAFETY: This regex is a compile-time constant and is validated by tests.
    static NUMBER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?|\.\d+").expect("static regex must compile"));

    NUMBER_RE
        .find_iter(condition)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Compares breakpoint sequences lexicographically.
///
/// A missing value is smaller than any present one, so an empty sequence is
/// the minimum and sorts first in ascending order.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use cmq_combine::normalize::compare_breakpoints;
///
/// assert_eq!(compare_breakpoints(&[320.0], &[768.0]), Ordering::Less);
/// assert_eq!(compare_breakpoints(&[], &[0.0]), Ordering::Less);
/// assert_eq!(compare_breakpoints(&[320.0, 10.0], &[320.0]), Ordering::Greater);
/// ```
pub fn compare_breakpoints(a: &[f64], b: &[f64]) -> Ordering {
    for (left, right) in a.iter().zip(b) {
        match left.total_cmp(right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_key_ignores_whitespace_and_punctuation() {
        let variants = [
            "screen and (min-width: 768px)",
            "screen and (min-width:768px)",
            "screen  and ( min-width : 768px )",
            "screen and min-width 768px",
        ];
        let key = normalized_key(variants[0]);
        assert_eq!(key, "screenandminwidth768px");
        for variant in variants {
            assert_eq!(normalized_key(variant), key, "variant: {variant}");
        }
    }

    #[test]
    fn test_normalized_key_drops_non_ascii_letters() {
        assert_eq!(normalized_key("(min-width: 50em) /* é */"), "minwidth50em");
        assert_eq!(normalized_key(""), "");
    }

    #[test]
    fn test_extract_numeric_handles_decimals_and_ratios() {
        assert_eq!(extract_numeric("(min-width: .5em)"), vec![0.5]);
        assert_eq!(
            extract_numeric("(-webkit-min-device-pixel-ratio: 1.5), (min-resolution: 144dpi)"),
            vec![1.5, 144.0]
        );
        assert_eq!(extract_numeric("(min-aspect-ratio: 16/9)"), vec![16.0, 9.0]);
    }

    #[test]
    fn test_compare_breakpoints_equal_sequences() {
        assert_eq!(compare_breakpoints(&[768.0], &[768.0]), Ordering::Equal);
        assert_eq!(compare_breakpoints(&[], &[]), Ordering::Equal);
    }
}
