//! Media-condition classification into ordering buckets.
//!
//! A [`ClassificationTable`] is plain data: an ordered list of
//! [`BucketRule`]s, each pairing a matcher with a sort direction and two
//! independent priorities. `scan_priority` decides which bucket claims a
//! condition; `output_priority` decides where that bucket is emitted. This is
//! what lets `print` match before `min-width` yet render last.
//!
//! # Example
//!
//! ```
//! use cmq_combine::classify::{ClassificationTable, OTHER_BUCKET};
//!
//! let table = ClassificationTable::default();
//! assert_eq!(table.classify("print and (min-width: 500px)"), "print");
//! assert_eq!(table.classify("screen and (min-width: 500px)"), "min-width");
//! assert_eq!(table.classify("(orientation: landscape)"), OTHER_BUCKET);
//! assert_eq!(table.output_order().last().copied(), Some("print"));
//! ```

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bucket id reserved for conditions no rule matches.
pub const OTHER_BUCKET: &str = "other";

/// Default output priority of the [`OTHER_BUCKET`].
pub const DEFAULT_OTHER_OUTPUT_PRIORITY: i32 = 90;

/// Direction in which a bucket's groups are sorted by breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Lowest breakpoint first (mobile-first `min-*` queries).
    #[default]
    Ascending,
    /// Highest breakpoint first (desktop-first `max-*` queries).
    Descending,
}

/// Predicate deciding whether a condition belongs to a bucket.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// ASCII case-insensitive substring test; the needle is stored lowercased.
    Contains(String),
    /// Regular-expression test against the raw condition text.
    Pattern(Regex),
}

impl Matcher {
    /// Builds a case-insensitive substring matcher.
    pub fn contains(needle: &str) -> Self {
        Self::Contains(needle.to_ascii_lowercase())
    }

    /// Compiles a pattern matcher for `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] when `pattern` does not compile.
    pub fn pattern(bucket: &str, pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                bucket: bucket.to_string(),
                source,
            })
    }

    pub fn is_match(&self, condition: &str) -> bool {
        match self {
            Self::Contains(needle) => condition.to_ascii_lowercase().contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(condition),
        }
    }
}

/// One classification entry.
#[derive(Debug, Clone)]
pub struct BucketRule {
    pub id: String,
    pub matcher: Matcher,
    pub direction: SortDirection,
    /// Lower values are tested first.
    pub scan_priority: i32,
    /// Lower values are emitted first.
    pub output_priority: i32,
}

impl BucketRule {
    pub fn new(
        id: &str,
        matcher: Matcher,
        direction: SortDirection,
        scan_priority: i32,
        output_priority: i32,
    ) -> Self {
        Self {
            id: id.to_string(),
            matcher,
            direction,
            scan_priority,
            output_priority,
        }
    }
}

/// Validated, scan-ordered classification table.
#[derive(Debug, Clone)]
pub struct ClassificationTable {
    rules: Vec<BucketRule>,
    other_output_priority: i32,
    other_direction: SortDirection,
}

impl ClassificationTable {
    /// Builds a table, sorting entries by `scan_priority` (ties keep the given
    /// order).
    ///
    /// # Errors
    ///
    /// Rejects empty ids, duplicate ids and the reserved [`OTHER_BUCKET`] id.
    pub fn new(mut rules: Vec<BucketRule>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.id.trim().is_empty() {
                return Err(ConfigError::InvalidBucket {
                    bucket: rule.id.clone(),
                    reason: "bucket id cannot be empty".to_string(),
                });
            }
            if rule.id == OTHER_BUCKET {
                return Err(ConfigError::ReservedBucket(rule.id.clone()));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(ConfigError::DuplicateBucket(rule.id.clone()));
            }
        }

        rules.sort_by_key(|rule| rule.scan_priority);
        Ok(Self {
            rules,
            other_output_priority: DEFAULT_OTHER_OUTPUT_PRIORITY,
            other_direction: SortDirection::Ascending,
        })
    }

    /// Overrides placement and sort direction of the [`OTHER_BUCKET`].
    pub fn with_other(mut self, output_priority: i32, direction: SortDirection) -> Self {
        self.other_output_priority = output_priority;
        self.other_direction = direction;
        self
    }

    /// Entries in scan order.
    pub fn rules(&self) -> &[BucketRule] {
        &self.rules
    }

    pub fn other_output_priority(&self) -> i32 {
        self.other_output_priority
    }

    pub fn other_direction(&self) -> SortDirection {
        self.other_direction
    }

    /// Returns the id of the first entry whose matcher accepts `condition`,
    /// or [`OTHER_BUCKET`].
    pub fn classify(&self, condition: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matcher.is_match(condition))
            .map_or(OTHER_BUCKET, |rule| rule.id.as_str())
    }

    /// Sort direction for `bucket`; unknown ids use the `other` direction.
    pub fn direction(&self, bucket: &str) -> SortDirection {
        self.rules
            .iter()
            .find(|rule| rule.id == bucket)
            .map_or(self.other_direction, |rule| rule.direction)
    }

    /// All bucket ids (including [`OTHER_BUCKET`]) in emission order.
    ///
    /// Equal output priorities fall back to scan order, with `other` after
    /// every configured bucket.
    pub fn output_order(&self) -> Vec<&str> {
        let mut order: Vec<(i32, usize, &str)> = self
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (rule.output_priority, index, rule.id.as_str()))
            .collect();
        order.push((self.other_output_priority, usize::MAX, OTHER_BUCKET));
        order.sort_by_key(|(priority, index, _)| (*priority, *index));
        order.into_iter().map(|(_, _, id)| id).collect()
    }
}

impl Default for ClassificationTable {
    /// The built-in table:
    ///
    /// | bucket | scan | output | direction |
    /// |--------|------|--------|-----------|
    /// | `print` | 0 | 100 | ascending |
    /// | `min-width` | 10 | 20 | ascending |
    /// | `max-width` | 20 | 30 | descending |
    /// | `min-height` | 30 | 40 | ascending |
    /// | `max-height` | 40 | 50 | descending |
    /// | `simple` | 50 | 10 | ascending |
    /// | `other` | – | 90 | ascending |
    fn default() -> Self {
        Self {
            rules: default_rules(),
            other_output_priority: DEFAULT_OTHER_OUTPUT_PRIORITY,
            other_direction: SortDirection::Ascending,
        }
    }
}

/// Pattern for bare media types such as `screen` or `only screen`.
pub const SIMPLE_MEDIA_PATTERN: &str = r"(?i)^\s*(?:only\s+|not\s+)?[a-z-]+\s*$";

fn default_rules() -> Vec<BucketRule> {
    use SortDirection::{Ascending, Descending};

    vec![
        BucketRule::new("print", Matcher::contains("print"), Ascending, 0, 100),
        BucketRule::new("min-width", Matcher::contains("min-width"), Ascending, 10, 20),
        BucketRule::new("max-width", Matcher::contains("max-width"), Descending, 20, 30),
        BucketRule::new("min-height", Matcher::contains("min-height"), Ascending, 30, 40),
        BucketRule::new("max-height", Matcher::contains("max-height"), Descending, 40, 50),
        BucketRule::new(
            "simple",
            // SAFETY: The pattern is a compile-time constant and is validated by tests.
            Matcher::Pattern(Regex::new(SIMPLE_MEDIA_PATTERN).expect("static regex must compile")),
            Ascending,
            50,
            10,
        ),
    ]
}

/// Returns `true` when `condition` mentions the `print` media type.
///
/// Used as the tie-break that keeps print groups after screen groups with
/// the same breakpoint.
pub fn is_print_condition(condition: &str) -> bool {
    condition.to_ascii_lowercase().contains("print")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_classifies_common_queries() {
        let table = ClassificationTable::default();
        let cases = [
            ("(min-width: 768px)", "min-width"),
            ("only screen and (min-width: 48em)", "min-width"),
            ("(max-width: 767px)", "max-width"),
            ("(min-height: 600px)", "min-height"),
            ("screen and (max-height: 400px)", "max-height"),
            ("print", "print"),
            ("PRINT and (min-width: 10cm)", "print"),
            ("screen", "simple"),
            ("only screen", "simple"),
            ("(orientation: portrait)", OTHER_BUCKET),
            ("screen and (-webkit-min-device-pixel-ratio: 2)", OTHER_BUCKET),
        ];
        for (condition, expected) in cases {
            assert_eq!(table.classify(condition), expected, "condition: {condition}");
        }
    }

    #[test]
    fn test_first_match_in_scan_order_wins() {
        let table = ClassificationTable::default();
        // Range query: min-width is scanned before max-width.
        assert_eq!(
            table.classify("(min-width: 320px) and (max-width: 767px)"),
            "min-width"
        );
    }

    #[test]
    fn test_output_order_is_independent_of_scan_order() {
        let table = ClassificationTable::default();
        assert_eq!(
            table.output_order(),
            vec![
                "simple",
                "min-width",
                "max-width",
                "min-height",
                "max-height",
                OTHER_BUCKET,
                "print"
            ]
        );
    }

    #[test]
    fn test_custom_table_sorts_by_scan_priority() {
        let table = ClassificationTable::new(vec![
            BucketRule::new("wide", Matcher::contains("width"), SortDirection::Ascending, 5, 1),
            BucketRule::new(
                "narrow",
                Matcher::contains("max-width"),
                SortDirection::Descending,
                1,
                2,
            ),
        ])
        .unwrap();
        assert_eq!(table.rules()[0].id, "narrow");
        assert_eq!(table.classify("(max-width: 10px)"), "narrow");
        assert_eq!(table.classify("(min-width: 10px)"), "wide");
        assert_eq!(table.direction("narrow"), SortDirection::Descending);
        assert_eq!(table.direction("unknown"), SortDirection::Ascending);
    }

    #[test]
    fn test_other_bucket_placement_can_be_overridden() {
        let table = ClassificationTable::default().with_other(0, SortDirection::Descending);
        assert_eq!(table.output_order().first().copied(), Some(OTHER_BUCKET));
        assert_eq!(table.direction(OTHER_BUCKET), SortDirection::Descending);
    }

    #[test]
    fn test_table_validation_errors() {
        let dup = ClassificationTable::new(vec![
            BucketRule::new("a", Matcher::contains("x"), SortDirection::Ascending, 0, 0),
            BucketRule::new("a", Matcher::contains("y"), SortDirection::Ascending, 1, 1),
        ]);
        assert!(matches!(dup, Err(ConfigError::DuplicateBucket(id)) if id == "a"));

        let reserved = ClassificationTable::new(vec![BucketRule::new(
            OTHER_BUCKET,
            Matcher::contains("x"),
            SortDirection::Ascending,
            0,
            0,
        )]);
        assert!(matches!(reserved, Err(ConfigError::ReservedBucket(_))));

        let empty = ClassificationTable::new(vec![BucketRule::new(
            " ",
            Matcher::contains("x"),
            SortDirection::Ascending,
            0,
            0,
        )]);
        assert!(matches!(empty, Err(ConfigError::InvalidBucket { .. })));

        assert!(matches!(
            Matcher::pattern("bad", "(unclosed"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_table_sends_everything_to_other() {
        let table = ClassificationTable::new(Vec::new()).unwrap();
        assert_eq!(table.classify("(min-width: 1px)"), OTHER_BUCKET);
        assert_eq!(table.output_order(), vec![OTHER_BUCKET]);
    }

    #[test]
    fn test_is_print_condition() {
        assert!(is_print_condition("Print"));
        assert!(is_print_condition("screen, print and (min-width: 1px)"));
        assert!(!is_print_condition("screen"));
    }
}
