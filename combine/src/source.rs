//! Source documents handed to the combiner.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{CombineError, Result};

/// One named CSS document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Display name used in reports and errors (usually the file path).
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads a UTF-8 stylesheet from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CombineError::SourceNotFound`] when `path` does not exist or
    /// is not a regular file, and [`CombineError::Io`] for other read failures.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => CombineError::SourceNotFound(path.to_path_buf()),
            _ => CombineError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        if !metadata.is_file() {
            return Err(CombineError::SourceNotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|source| CombineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), text))
    }
}
