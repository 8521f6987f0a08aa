//! Combine configuration.
//!
//! Defines the YAML/JSON-serializable configuration that overrides the
//! classification table, output layout and serializer formatting.
//!
//! # Example YAML
//!
//! ```yaml
//! log: true
//! keyframes_last: false
//! other_output_priority: 90
//! other_direction: ascending
//! format:
//!   indent: "\t"
//!   line_ending: crlf
//! buckets:
//!   - bucket: print
//!     contains: print
//!     direction: ascending
//!     scan_priority: 0
//!     output_priority: 100
//!   - bucket: min-width
//!     contains: min-width
//!     direction: ascending
//!     scan_priority: 10
//!     output_priority: 20
//!   - bucket: retina
//!     pattern: "(?i)(min-resolution|device-pixel-ratio)"
//!     direction: ascending
//!     scan_priority: 15
//!     output_priority: 60
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use cmq_core::SerializeOptions;
use serde::{Deserialize, Serialize};

use crate::classify::{BucketRule, ClassificationTable, Matcher, SortDirection};
use crate::error::ConfigError;

/// Serializable form of one [`BucketRule`].
///
/// Exactly one of `contains` or `pattern` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
    pub scan_priority: i32,
    pub output_priority: i32,
}

impl BucketSpec {
    /// Compiles the descriptor into a table entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBucket`] unless exactly one matcher is
    /// given, or [`ConfigError::InvalidPattern`] for a bad regex.
    pub fn compile(&self) -> Result<BucketRule, ConfigError> {
        let matcher = match (&self.contains, &self.pattern) {
            (Some(needle), None) => Matcher::contains(needle),
            (None, Some(pattern)) => Matcher::pattern(&self.bucket, pattern)?,
            (Some(_), Some(_)) => {
                return Err(self.invalid("set either 'contains' or 'pattern', not both"));
            }
            (None, None) => return Err(self.invalid("missing 'contains' or 'pattern'")),
        };
        Ok(BucketRule::new(
            &self.bucket,
            matcher,
            self.direction,
            self.scan_priority,
            self.output_priority,
        ))
    }

    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::InvalidBucket {
            bucket: self.bucket.clone(),
            reason: reason.to_string(),
        }
    }
}

impl From<&BucketRule> for BucketSpec {
    fn from(rule: &BucketRule) -> Self {
        let (contains, pattern) = match &rule.matcher {
            Matcher::Contains(needle) => (Some(needle.clone()), None),
            Matcher::Pattern(regex) => (None, Some(regex.as_str().to_string())),
        };
        Self {
            bucket: rule.id.clone(),
            contains,
            pattern,
            direction: rule.direction,
            scan_priority: rule.scan_priority,
            output_priority: rule.output_priority,
        }
    }
}

/// Top-level combine configuration.
///
/// Missing fields take their defaults, so an empty file is the built-in
/// behavior.
///
/// # Examples
///
/// ```
/// use cmq_combine::config::CombineConfig;
///
/// let config: CombineConfig = serde_yaml::from_str("keyframes_last: true").unwrap();
/// assert!(config.keyframes_last);
/// assert_eq!(config.buckets.len(), 6);
///
/// let options = config.into_options().unwrap();
/// assert_eq!(options.table.classify("(max-width: 10px)"), "max-width");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Emit per-run summaries at `info` level.
    pub log: bool,
    /// Move `@keyframes` rules after the media groups.
    pub keyframes_last: bool,
    pub other_output_priority: i32,
    pub other_direction: SortDirection,
    pub format: SerializeOptions,
    pub buckets: Vec<BucketSpec>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self::from(&CombineOptions::default())
    }
}

impl CombineConfig {
    /// Loads configuration from a YAML file, or JSON when the extension is
    /// `.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or a parse
    /// error for malformed content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let config = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(config)
    }

    /// Saves the configuration as YAML, or JSON when the extension is `.json`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    /// Validates the configuration into runtime options.
    ///
    /// # Errors
    ///
    /// Returns the first invalid bucket descriptor or table violation.
    pub fn into_options(self) -> Result<CombineOptions, ConfigError> {
        let rules = self
            .buckets
            .iter()
            .map(BucketSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let table = ClassificationTable::new(rules)?
            .with_other(self.other_output_priority, self.other_direction);

        Ok(CombineOptions {
            table,
            format: self.format,
            keyframes_last: self.keyframes_last,
            log: self.log,
        })
    }
}

impl From<&CombineOptions> for CombineConfig {
    fn from(options: &CombineOptions) -> Self {
        Self {
            log: options.log,
            keyframes_last: options.keyframes_last,
            other_output_priority: options.table.other_output_priority(),
            other_direction: options.table.other_direction(),
            format: options.format.clone(),
            buckets: options.table.rules().iter().map(BucketSpec::from).collect(),
        }
    }
}

/// Validated runtime options for [`MediaCombiner`](crate::MediaCombiner).
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    pub table: ClassificationTable,
    pub format: SerializeOptions,
    /// Move `@keyframes` rules after the media groups.
    pub keyframes_last: bool,
    /// Emit per-run summaries at `info` level.
    pub log: bool,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
