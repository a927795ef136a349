//! Crate-level error type.
//!
//! Each module reports failures through its own error enum; [`Error`]
//! aggregates them and classifies every failure into one [`ErrorKind`],
//! which is what crosses the C boundary.

use crate::booster::TrainError;
use crate::config::ConfigError;
use crate::data::{DatasetError, DeserializeError, SerializeError, TextReadError};
use crate::model::ModelParseError;

/// Coarse failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong shape, length, dtype tag or option value supplied by the caller.
    InvalidArgument,
    /// A file or buffer whose content cannot be parsed.
    MalformedInput,
    /// A file that cannot be opened, read or written.
    ResourceUnavailable,
    /// A released, stale or null handle.
    InvalidHandle,
    /// Unrecognized or conflicting configuration options.
    ConfigurationError,
}

impl ErrorKind {
    /// Stable integer code; the C API returns its negation.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => 1,
            ErrorKind::MalformedInput => 2,
            ErrorKind::ResourceUnavailable => 3,
            ErrorKind::InvalidHandle => 4,
            ErrorKind::ConfigurationError => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::MalformedInput => "MalformedInput",
            ErrorKind::ResourceUnavailable => "ResourceUnavailable",
            ErrorKind::InvalidHandle => "InvalidHandle",
            ErrorKind::ConfigurationError => "ConfigurationError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Any failure produced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    TextRead(#[from] TextReadError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error(transparent)]
    ModelParse(#[from] ModelParseError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(e) => e.kind(),
            Error::Dataset(e) => e.kind(),
            Error::TextRead(e) => e.kind(),
            Error::Serialize(_) => ErrorKind::ResourceUnavailable,
            Error::Deserialize(e) => e.kind(),
            Error::ModelParse(e) => e.kind(),
            Error::Train(_) => ErrorKind::InvalidArgument,
            Error::Json(_) => ErrorKind::ResourceUnavailable,
            Error::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Io { .. } => ErrorKind::ResourceUnavailable,
        }
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_distinct() {
        let kinds = [
            ErrorKind::InvalidArgument,
            ErrorKind::MalformedInput,
            ErrorKind::ResourceUnavailable,
            ErrorKind::InvalidHandle,
            ErrorKind::ConfigurationError,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.code()).collect();
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn io_errors_are_resource_unavailable() {
        let err = Error::io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
        assert!(err.to_string().contains("missing.txt"));
    }
}
