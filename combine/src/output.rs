//! Output formatting for combine reports.

use crate::report::{CombineReport, ReportBundle};

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ReportFormat {
    Json,
    Yaml,
    Text,
}

/// Formats a report bundle in the requested format.
pub fn format_bundle(bundle: &ReportBundle, format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(bundle)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        ReportFormat::Yaml => {
            serde_yaml::to_string(bundle).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        ReportFormat::Text => Ok(bundle_to_text(bundle)),
    }
}

/// One-line human summary of a single report.
///
/// # Examples
///
/// ```
/// use cmq_combine::output::summary_line;
/// use cmq_combine::report::CombineReport;
///
/// let report = CombineReport {
///     sources: vec!["site.css".into()],
///     extracted_count: 5,
///     combined_count: 3,
///     ..Default::default()
/// };
/// assert_eq!(summary_line(&report), "site.css: 5 media queries extracted, 3 combined");
/// ```
pub fn summary_line(report: &CombineReport) -> String {
    let name = if report.sources.is_empty() {
        "<input>".to_string()
    } else {
        report.sources.join(", ")
    };
    format!(
        "{name}: {} media queries extracted, {} combined",
        report.extracted_count, report.combined_count
    )
}

fn bundle_to_text(bundle: &ReportBundle) -> String {
    let mut out = String::new();

    for report in &bundle.reports {
        out.push_str(&summary_line(report));
        out.push('\n');
        for bucket in &report.buckets {
            out.push_str(&format!("  {:<12} {}\n", bucket.bucket, bucket.groups));
        }
        for notice in &report.notices {
            out.push_str(&format!("  notice: {notice}\n"));
        }
    }

    for failure in &bundle.failures {
        out.push_str(&format!("FAILED {}: {}\n", failure.source, failure.error));
    }

    out.push_str(&format!(
        "total: {} extracted, {} combined, {} failed\n",
        bundle.total_extracted(),
        bundle.total_combined(),
        bundle.failures.len()
    ));
    out
}
