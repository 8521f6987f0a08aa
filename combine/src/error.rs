//! Error types for media query combining.
//!
//! [`CombineError`] covers per-document failures surfaced to the caller;
//! [`ConfigError`] covers configuration loading and classification-table
//! validation. "Nothing was merged" is not an error; see
//! [`Notice`](crate::report::Notice).

use std::path::PathBuf;

use cmq_core::ParseError;
use thiserror::Error;

/// Errors raised while combining one set of source documents.
#[derive(Debug, Error)]
pub enum CombineError {
    /// An input path does not exist or is not a regular file.
    #[error("source file \"{}\" not found", .0.display())]
    SourceNotFound(PathBuf),

    /// A document could not be parsed; the whole invocation is abandoned.
    #[error("failed to parse {source_name}: {error}")]
    ParseFailure {
        source_name: String,
        #[source]
        error: ParseError,
    },

    /// Reading an input or writing an output failed.
    #[error("I/O error on \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Options could not be built from configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while loading configuration or building a classification
/// table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bucket descriptor is malformed (empty id, no matcher, two matchers).
    #[error("invalid bucket '{bucket}': {reason}")]
    InvalidBucket { bucket: String, reason: String },

    /// Two bucket descriptors share an id.
    #[error("duplicate bucket '{0}'")]
    DuplicateBucket(String),

    /// A descriptor uses the id reserved for unmatched conditions.
    #[error("bucket id '{0}' is reserved for unmatched conditions")]
    ReservedBucket(String),

    /// A pattern matcher does not compile.
    #[error("invalid pattern for bucket '{bucket}': {source}")]
    InvalidPattern {
        bucket: String,
        #[source]
        source: regex::Error,
    },
}

/// Convenience alias for results with [`CombineError`].
pub type Result<T> = std::result::Result<T, CombineError>;
