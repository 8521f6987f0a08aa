//! Media-rule grouping across one or more documents.
//!
//! A single left-to-right scan pulls every top-level `@media` rule into a
//! [`MediaGroup`] keyed by [`normalized_key`]. Non-media rules are kept in
//! scan order so base styles retain their authored cascade order after the
//! media blocks are relocated.

use std::collections::HashMap;

use cmq_core::{MediaRule, Rule, Stylesheet};
use tracing::{debug, trace};

use crate::classify::ClassificationTable;
use crate::normalize::{extract_numeric, normalized_key};

/// Same-key media rules folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaGroup {
    /// Condition text of the first contributing media rule.
    pub condition: String,
    /// Merge identity (see [`normalized_key`]).
    pub key: String,
    /// Numeric tokens of `condition`, used for intra-bucket sorting.
    pub breakpoints: Vec<f64>,
    /// Bucket id assigned by the classification table.
    pub bucket: String,
    /// Nested rules of every contributing media rule, concatenated in
    /// first-occurrence order.
    pub rules: Vec<Rule>,
    /// Creation index; the stable tie-break when breakpoints are equal.
    pub first_seen: usize,
    /// Number of source media rules folded into this group.
    pub sources: usize,
}

impl MediaGroup {
    fn new(media: MediaRule, key: String, bucket: &str, first_seen: usize) -> Self {
        Self {
            breakpoints: extract_numeric(&media.condition),
            condition: media.condition,
            key,
            bucket: bucket.to_string(),
            rules: media.rules,
            first_seen,
            sources: 1,
        }
    }

    /// Converts the group back into a single `@media` rule.
    pub fn into_rule(self) -> Rule {
        Rule::Media(MediaRule {
            condition: self.condition,
            rules: self.rules,
        })
    }
}

/// Result of one merge pass.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Non-media rules in encountered order across all inputs.
    pub base: Vec<Rule>,
    /// Media groups in first-occurrence order.
    pub groups: Vec<MediaGroup>,
    /// Number of source `@media` rules seen.
    pub extracted_count: usize,
}

impl MergeOutcome {
    /// Number of distinct media groups produced.
    pub fn combined_count(&self) -> usize {
        self.groups.len()
    }
}

/// Accumulates rules from successive documents.
///
/// # Examples
///
/// ```
/// use cmq_combine::classify::ClassificationTable;
/// use cmq_combine::merge::Merger;
///
/// let table = ClassificationTable::default();
/// let mut merger = Merger::new(&table);
/// merger.push_stylesheet(cmq_core::parse("@media (min-width: 1px){.a{x:y}}").unwrap());
/// merger.push_stylesheet(cmq_core::parse("@media (min-width:1px){.b{x:y}}").unwrap());
///
/// let outcome = merger.finish();
/// assert_eq!(outcome.extracted_count, 2);
/// assert_eq!(outcome.combined_count(), 1);
/// assert_eq!(outcome.groups[0].rules.len(), 2);
/// ```
pub struct Merger<'t> {
    table: &'t ClassificationTable,
    index: HashMap<String, usize>,
    outcome: MergeOutcome,
}

impl<'t> Merger<'t> {
    pub fn new(table: &'t ClassificationTable) -> Self {
        Self {
            table,
            index: HashMap::new(),
            outcome: MergeOutcome::default(),
        }
    }

    /// Folds every top-level rule of `sheet`.
    pub fn push_stylesheet(&mut self, sheet: Stylesheet) {
        for rule in sheet.rules {
            self.push(rule);
        }
    }

    /// Folds one top-level rule.
    pub fn push(&mut self, rule: Rule) {
        let Rule::Media(media) = rule else {
            self.outcome.base.push(rule);
            return;
        };

        self.outcome.extracted_count += 1;
        let key = normalized_key(&media.condition);

        if let Some(&position) = self.index.get(&key) {
            let group = &mut self.outcome.groups[position];
            trace!(condition = %media.condition, into = %group.condition, "Folding media rule");
            group.rules.extend(media.rules);
            group.sources += 1;
            return;
        }

        let position = self.outcome.groups.len();
        let bucket = self.table.classify(&media.condition);
        debug!(condition = %media.condition, bucket, "New media group");
        self.index.insert(key.clone(), position);
        self.outcome
            .groups
            .push(MediaGroup::new(media, key, bucket, position));
    }

    pub fn finish(self) -> MergeOutcome {
        self.outcome
    }
}

/// Merges the top-level rules of `sheets`, treated as one concatenated
/// document.
pub fn merge_stylesheets<I>(sheets: I, table: &ClassificationTable) -> MergeOutcome
where
    I: IntoIterator<Item = Stylesheet>,
{
    let mut merger = Merger::new(table);
    for sheet in sheets {
        merger.push_stylesheet(sheet);
    }
    merger.finish()
}

#[cfg(test)]
mod tests {
    use cmq_core::{StyleRule, parse};

    use super::*;

    fn selectors(rules: &[Rule]) -> Vec<String> {
        rules
            .iter()
            .filter_map(|rule| match rule {
                Rule::Style(StyleRule { selectors, .. }) => Some(selectors.join(",")),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_merge_folds_equivalent_conditions_in_order() {
        let sheet = parse(
            "@media (min-width: 500px){.a{color:red}} .b{color:blue} @media ( min-width:500px ){.c{color:green}}",
        )
        .unwrap();
        let outcome = merge_stylesheets([sheet], &ClassificationTable::default());

        assert_eq!(outcome.extracted_count, 2);
        assert_eq!(outcome.combined_count(), 1);
        let group = &outcome.groups[0];
        assert_eq!(group.condition, "(min-width: 500px)");
        assert_eq!(group.bucket, "min-width");
        assert_eq!(group.breakpoints, vec![500.0]);
        assert_eq!(group.sources, 2);
        assert_eq!(selectors(&group.rules), vec![".a", ".c"]);
        assert_eq!(selectors(&outcome.base), vec![".b"]);
    }

    #[test]
    fn test_merge_keeps_base_rules_in_scan_order_across_documents() {
        let first = parse("/* one */ .a{x:1} @media print{.p{x:1}} .b{x:2}").unwrap();
        let second = parse(".c{x:3} @media print{.q{x:2}} @keyframes k{from{x:0}}").unwrap();
        let outcome = merge_stylesheets([first, second], &ClassificationTable::default());

        assert_eq!(outcome.base.len(), 5);
        assert!(matches!(outcome.base[0], Rule::Comment(_)));
        assert_eq!(selectors(&outcome.base), vec![".a", ".b", ".c"]);
        assert!(matches!(outcome.base[4], Rule::Keyframes(_)));
        assert_eq!(selectors(&outcome.groups[0].rules), vec![".p", ".q"]);
    }

    #[test]
    fn test_merge_distinct_keys_create_distinct_groups() {
        let sheet = parse(
            "@media (min-width: 500px){.a{x:y}} @media (min-width: 501px){.b{x:y}} @media screen{.c{x:y}}",
        )
        .unwrap();
        let outcome = merge_stylesheets([sheet], &ClassificationTable::default());
        assert_eq!(outcome.combined_count(), 3);
        let first_seen: Vec<usize> = outcome.groups.iter().map(|g| g.first_seen).collect();
        assert_eq!(first_seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_merge_counts_empty_media_blocks() {
        let sheet = parse("@media print{} @media print{.a{x:y}}").unwrap();
        let outcome = merge_stylesheets([sheet], &ClassificationTable::default());
        assert_eq!(outcome.extracted_count, 2);
        assert_eq!(outcome.combined_count(), 1);
        assert_eq!(outcome.groups[0].rules.len(), 1);
    }

    #[test]
    fn test_merge_without_media_rules() {
        let sheet = parse(".a{x:y}").unwrap();
        let outcome = merge_stylesheets([sheet], &ClassificationTable::default());
        assert_eq!(outcome.extracted_count, 0);
        assert_eq!(outcome.combined_count(), 0);
        assert_eq!(outcome.base.len(), 1);
    }

    #[test]
    fn test_media_group_into_rule() {
        let sheet = parse("@media print{.a{x:y}}").unwrap();
        let outcome = merge_stylesheets([sheet.clone()], &ClassificationTable::default());
        let rule = outcome.groups.into_iter().next().unwrap().into_rule();
        assert_eq!(rule, sheet.rules[0]);
    }
}
