//! Structured reporting for combine runs.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Informational, non-fatal condition detected during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// No two media rules shared a key, so nothing was merged.
    NoChangeDetected,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoChangeDetected => write!(f, "no_change_detected"),
        }
    }
}

/// Per-bucket group counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub bucket: String,
    pub groups: usize,
}

/// Counters for one combine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineReport {
    /// Names of the source documents, in input order.
    pub sources: Vec<String>,
    /// Number of source `@media` rules seen.
    pub extracted_count: usize,
    /// Number of distinct media groups emitted.
    pub combined_count: usize,
    /// Non-empty buckets in emission order.
    pub buckets: Vec<BucketSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl CombineReport {
    /// Number of media rules removed by merging.
    pub fn merged_away(&self) -> usize {
        self.extracted_count.saturating_sub(self.combined_count)
    }

    pub fn has_notice(&self, notice: Notice) -> bool {
        self.notices.contains(&notice)
    }
}

/// One failed input in a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub source: String,
    pub error: String,
}

/// Reports for a batch of independent combine invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportBundle {
    pub version: String,
    /// RFC 3339 timestamp of bundle creation.
    pub generated_at: String,
    pub reports: Vec<CombineReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureReport>,
}

impl ReportBundle {
    pub fn new(version: &str, reports: Vec<CombineReport>, failures: Vec<FailureReport>) -> Self {
        Self {
            version: version.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            reports,
            failures,
        }
    }

    pub fn total_extracted(&self) -> usize {
        self.reports.iter().map(|r| r.extracted_count).sum()
    }

    pub fn total_combined(&self) -> usize {
        self.reports.iter().map(|r| r.combined_count).sum()
    }
}
