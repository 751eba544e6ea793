#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PakError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The asset cannot be represented; it is skipped and the archive proceeds.
    #[error("unsupported format in {}: {reason}", .path.display())]
    Unsupported { path: PathBuf, reason: String },

    /// The input is broken in a way that indicates a caller error. Fatal.
    #[error("malformed input in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("name hash collision: {name} ({}) clashes with an earlier asset", .path.display())]
    Collision { name: String, path: PathBuf },

    #[error("path is outside input dir: {0}")]
    Outside(String),

    #[error("invalid archive: {0}")]
    Invalid(String),
}

impl PakError {
    pub(crate) fn unsupported(path: &std::path::Path, reason: impl Into<String>) -> Self {
        PakError::Unsupported {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        PakError::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Per-asset failures that the builder logs and skips.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PakError::Unsupported { .. })
    }
}

pub type PakResult<T> = Result<T, PakError>;
