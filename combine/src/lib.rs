//! Combine, deduplicate and order CSS `@media` blocks.
//!
//! Parses one or more stylesheets, folds `@media` rules whose conditions are
//! equal after [normalization](normalize::normalized_key), classifies each
//! group into an ordering bucket and re-emits a single stylesheet:
//!
//! 1. `@charset` / `@import` rules, in source order,
//! 2. every other non-media rule, in source order,
//! 3. the media groups, bucket by bucket in output-priority order, each
//!    bucket sorted by breakpoint,
//! 4. `@keyframes` rules, when [`CombineOptions::keyframes_last`] is set
//!    (otherwise they stay in step 2).
//!
//! # Main entry points
//!
//! - [`combine_css`]: one document, default options.
//! - [`MediaCombiner::combine`]: several documents treated as one
//!   concatenated stylesheet, with caller-supplied options.
//!
//! # Example
//!
//! ```
//! use cmq_combine::combine_css;
//!
//! let combined = combine_css(
//!     "@media (min-width: 500px){.a{color:red}} .b{color:blue} @media (min-width:500px){.c{color:green}}",
//! ).unwrap();
//!
//! assert_eq!(combined.report.extracted_count, 2);
//! assert_eq!(combined.report.combined_count, 1);
//! assert_eq!(
//!     combined.css,
//!     ".b {\n  color: blue;\n}\n\n@media (min-width: 500px) {\n  .a {\n    color: red;\n  }\n  .c {\n    color: green;\n  }\n}\n"
//! );
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod order;
pub mod output;
pub mod report;
pub mod source;

use cmq_core::{Rule, Stylesheet, parse, serialize};
use tracing::{debug, info, warn};

pub use config::{CombineConfig, CombineOptions};
pub use error::{CombineError, ConfigError, Result};
pub use report::{CombineReport, Notice};
pub use source::Source;

use merge::{MediaGroup, merge_stylesheets};
use order::order_groups;
use report::BucketSummary;

/// Serialized output of one combine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combined {
    pub css: String,
    pub report: CombineReport,
}

/// Runs the parse → merge → order → serialize pipeline.
///
/// Holds only immutable options, so one combiner can serve any number of
/// independent invocations, including from several threads.
#[derive(Debug, Clone, Default)]
pub struct MediaCombiner {
    options: CombineOptions,
}

impl MediaCombiner {
    pub fn new(options: CombineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CombineOptions {
        &self.options
    }

    /// Combines `sources` as one concatenated stylesheet.
    ///
    /// # Errors
    ///
    /// Returns [`CombineError::ParseFailure`] for the first source that does
    /// not parse; nothing is emitted in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmq_combine::{MediaCombiner, Source};
    ///
    /// let combiner = MediaCombiner::default();
    /// let combined = combiner
    ///     .combine(&[
    ///         Source::new("a.css", "@media print{.a{x:y}}"),
    ///         Source::new("b.css", ".b{x:y} @media print{.c{x:y}}"),
    ///     ])
    ///     .unwrap();
    /// assert_eq!(combined.report.sources, vec!["a.css", "b.css"]);
    /// assert_eq!(combined.report.combined_count, 1);
    /// ```
    pub fn combine(&self, sources: &[Source]) -> Result<Combined> {
        let sheets = sources
            .iter()
            .map(|source| {
                parse(&source.text).map_err(|error| CombineError::ParseFailure {
                    source_name: source.name.clone(),
                    error,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let table = &self.options.table;
        let outcome = merge_stylesheets(sheets, table);
        let extracted_count = outcome.extracted_count;
        let combined_count = outcome.combined_count();
        let groups = order_groups(outcome.groups, table);

        let mut notices = Vec::new();
        if extracted_count > 0 && extracted_count == combined_count {
            notices.push(Notice::NoChangeDetected);
        }

        let report = CombineReport {
            sources: sources.iter().map(|source| source.name.clone()).collect(),
            extracted_count,
            combined_count,
            buckets: summarize_buckets(&groups),
            notices,
        };

        if self.options.log {
            info!(
                sources = ?report.sources,
                extracted = extracted_count,
                combined = combined_count,
                "Combined media queries"
            );
        } else {
            debug!(
                extracted = extracted_count,
                combined = combined_count,
                "Combined media queries"
            );
        }

        for notice in &report.notices {
            warn!(sources = ?report.sources, %notice, "No media queries were merged");
        }

        let sheet = self.assemble(outcome.base, groups);
        Ok(Combined {
            css: serialize(&sheet, &self.options.format),
            report,
        })
    }

    /// Combines a single document.
    pub fn combine_text(&self, name: &str, text: &str) -> Result<Combined> {
        self.combine(&[Source::new(name, text)])
    }

    fn assemble(&self, base: Vec<Rule>, groups: Vec<MediaGroup>) -> Stylesheet {
        let mut leading = Vec::new();
        let mut body = Vec::new();
        let mut keyframes = Vec::new();

        for rule in base {
            if rule.is_leading() {
                leading.push(rule);
            } else if self.options.keyframes_last && matches!(rule, Rule::Keyframes(_)) {
                keyframes.push(rule);
            } else {
                body.push(rule);
            }
        }

        let mut rules = leading;
        rules.append(&mut body);
        rules.extend(groups.into_iter().map(MediaGroup::into_rule));
        rules.append(&mut keyframes);
        Stylesheet::new(rules)
    }
}

/// Combines one document with default options.
pub fn combine_css(text: &str) -> Result<Combined> {
    MediaCombiner::default().combine_text("<input>", text)
}

fn summarize_buckets(groups: &[MediaGroup]) -> Vec<BucketSummary> {
    let mut buckets: Vec<BucketSummary> = Vec::new();
    for group in groups {
        match buckets.last_mut() {
            Some(last) if last.bucket == group.bucket => last.groups += 1,
            _ => buckets.push(BucketSummary {
                bucket: group.bucket.clone(),
                groups: 1,
            }),
        }
    }
    buckets
}
