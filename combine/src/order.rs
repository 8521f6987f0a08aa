//! Bucket and breakpoint ordering of merged media groups.

use std::collections::HashMap;

use crate::classify::{ClassificationTable, SortDirection, is_print_condition};
use crate::merge::MediaGroup;
use crate::normalize::compare_breakpoints;

/// Orders groups for emission.
///
/// Groups are partitioned by bucket, each bucket is sorted with
/// [`sort_bucket`], and buckets are concatenated in
/// [`ClassificationTable::output_order`].
///
/// # Examples
///
/// ```
/// use cmq_combine::classify::ClassificationTable;
/// use cmq_combine::merge::merge_stylesheets;
/// use cmq_combine::order::order_groups;
///
/// let sheet = cmq_core::parse(
///     "@media print{.p{x:y}} @media (max-width: 320px){.a{x:y}} @media (max-width: 1024px){.b{x:y}}",
/// ).unwrap();
/// let table = ClassificationTable::default();
/// let outcome = merge_stylesheets([sheet], &table);
///
/// let ordered = order_groups(outcome.groups, &table);
/// let conditions: Vec<&str> = ordered.iter().map(|g| g.condition.as_str()).collect();
/// assert_eq!(conditions, ["(max-width: 1024px)", "(max-width: 320px)", "print"]);
/// ```
pub fn order_groups(groups: Vec<MediaGroup>, table: &ClassificationTable) -> Vec<MediaGroup> {
    let total = groups.len();
    let mut by_bucket: HashMap<String, Vec<MediaGroup>> = HashMap::new();
    for group in groups {
        by_bucket.entry(group.bucket.clone()).or_default().push(group);
    }

    let mut ordered = Vec::with_capacity(total);
    for bucket in table.output_order() {
        let Some(mut members) = by_bucket.remove(bucket) else {
            continue;
        };
        sort_bucket(&mut members, table.direction(bucket));
        ordered.extend(members);
    }

    // Groups tagged by a different table still get emitted, in source order.
    let mut leftovers: Vec<MediaGroup> = by_bucket.into_values().flatten().collect();
    leftovers.sort_by_key(|group| group.first_seen);
    ordered.extend(leftovers);

    ordered
}

/// Sorts one bucket by breakpoints in `direction`.
///
/// Equal breakpoints keep first-occurrence order, except that print groups
/// always follow non-print groups within a tie.
pub fn sort_bucket(groups: &mut [MediaGroup], direction: SortDirection) {
    groups.sort_by_key(|group| group.first_seen);
    groups.sort_by(|a, b| {
        let by_value = compare_breakpoints(&a.breakpoints, &b.breakpoints);
        let by_value = match direction {
            SortDirection::Ascending => by_value,
            SortDirection::Descending => by_value.reverse(),
        };
        by_value.then_with(|| {
            is_print_condition(&a.condition).cmp(&is_print_condition(&b.condition))
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{BucketRule, Matcher, OTHER_BUCKET};
    use crate::normalize::{extract_numeric, normalized_key};

    fn group(condition: &str, bucket: &str, first_seen: usize) -> MediaGroup {
        MediaGroup {
            condition: condition.to_string(),
            key: normalized_key(condition),
            breakpoints: extract_numeric(condition),
            bucket: bucket.to_string(),
            rules: Vec::new(),
            first_seen,
            sources: 1,
        }
    }

    fn conditions(groups: &[MediaGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.condition.as_str()).collect()
    }

    #[test]
    fn test_min_width_ascending_max_width_descending() {
        let table = ClassificationTable::default();
        let groups = vec![
            group("(min-width: 768px)", "min-width", 0),
            group("(max-width: 768px)", "max-width", 1),
            group("(min-width: 1024px)", "min-width", 2),
            group("(max-width: 320px)", "max-width", 3),
            group("(min-width: 320px)", "min-width", 4),
            group("(max-width: 1024px)", "max-width", 5),
        ];
        let ordered = order_groups(groups, &table);
        assert_eq!(
            conditions(&ordered),
            vec![
                "(min-width: 320px)",
                "(min-width: 768px)",
                "(min-width: 1024px)",
                "(max-width: 1024px)",
                "(max-width: 768px)",
                "(max-width: 320px)",
            ]
        );
    }

    #[test]
    fn test_ties_keep_first_occurrence_with_print_last() {
        let mut groups = vec![
            group("print and (min-width: 500px)", "min-width", 0),
            group("screen and (min-width: 500px)", "min-width", 1),
            group("(min-width: 500px) and (orientation: landscape)", "min-width", 2),
            group("(min-width: 100px)", "min-width", 3),
        ];
        sort_bucket(&mut groups, SortDirection::Ascending);
        assert_eq!(
            conditions(&groups),
            vec![
                "(min-width: 100px)",
                "screen and (min-width: 500px)",
                "(min-width: 500px) and (orientation: landscape)",
                "print and (min-width: 500px)",
            ]
        );

        sort_bucket(&mut groups, SortDirection::Descending);
        assert_eq!(
            conditions(&groups),
            vec![
                "screen and (min-width: 500px)",
                "(min-width: 500px) and (orientation: landscape)",
                "print and (min-width: 500px)",
                "(min-width: 100px)",
            ]
        );
    }

    #[test]
    fn test_groups_without_numbers_sort_as_minimum() {
        let mut groups = vec![
            group("(min-width: 10px)", OTHER_BUCKET, 0),
            group("(orientation: portrait)", OTHER_BUCKET, 1),
        ];
        sort_bucket(&mut groups, SortDirection::Ascending);
        assert_eq!(groups[0].condition, "(orientation: portrait)");

        sort_bucket(&mut groups, SortDirection::Descending);
        assert_eq!(groups[1].condition, "(orientation: portrait)");
    }

    #[test]
    fn test_print_bucket_renders_after_everything() {
        let table = ClassificationTable::default();
        let groups = vec![
            group("print", "print", 0),
            group("(min-width: 500px)", "min-width", 1),
            group("(orientation: portrait)", OTHER_BUCKET, 2),
            group("screen", "simple", 3),
            group("(max-width: 500px)", "max-width", 4),
        ];
        let ordered = order_groups(groups, &table);
        assert_eq!(
            conditions(&ordered),
            vec![
                "screen",
                "(min-width: 500px)",
                "(max-width: 500px)",
                "(orientation: portrait)",
                "print",
            ]
        );
    }

    #[test]
    fn test_unknown_buckets_are_appended_in_source_order() {
        let table = ClassificationTable::new(vec![BucketRule::new(
            "min-width",
            Matcher::contains("min-width"),
            SortDirection::Ascending,
            0,
            0,
        )])
        .unwrap();
        let groups = vec![
            group("b", "stale-b", 1),
            group("(min-width: 1px)", "min-width", 2),
            group("a", "stale-a", 0),
        ];
        let ordered = order_groups(groups, &table);
        assert_eq!(conditions(&ordered), vec!["(min-width: 1px)", "a", "b"]);
    }
}
