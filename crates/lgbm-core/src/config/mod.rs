//! Parameter strings and typed configuration.
//!
//! Callers pass parameters as one `key=value key=value ...` string.
//! [`Params`] resolves aliases and rejects unknown or conflicting keys;
//! [`DatasetConfig`] and [`BoosterConfig`] read the keys relevant to them.

mod booster;
mod dataset;
mod params;

pub use booster::{BoosterConfig, RegularizationParams, TreeParams};
pub use dataset::DatasetConfig;
pub use params::Params;

use crate::error::ErrorKind;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors from parsing or validating configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A token without `=` or with an empty key.
    MalformedToken(String),
    /// A key that is neither a known parameter nor an alias.
    UnknownParameter(String),
    /// The same parameter given twice with different values.
    ConflictingValues {
        key: &'static str,
        first: String,
        second: String,
    },
    /// A value that does not parse as the parameter's type.
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    /// A value outside the parameter's allowed range.
    OutOfRange {
        key: &'static str,
        value: String,
        constraint: &'static str,
    },
    UnknownObjective(String),
    UnknownMetric(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMetric(_) => ErrorKind::InvalidArgument,
            _ => ErrorKind::ConfigurationError,
        }
    }

    pub(crate) fn out_of_range(key: &'static str, value: impl ToString, constraint: &'static str) -> Self {
        Self::OutOfRange {
            key,
            value: value.to_string(),
            constraint,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedToken(token) => {
                write!(f, "malformed parameter '{}', expected key=value", token)
            }
            Self::UnknownParameter(key) => write!(f, "unknown parameter '{}'", key),
            Self::ConflictingValues { key, first, second } => {
                write!(f, "parameter {} given conflicting values '{}' and '{}'", key, first, second)
            }
            Self::InvalidValue { key, value, expected } => {
                write!(f, "cannot parse {}='{}' as {}", key, value, expected)
            }
            Self::OutOfRange { key, value, constraint } => {
                write!(f, "{} must be {}, got {}", key, constraint, value)
            }
            Self::UnknownObjective(name) => write!(f, "unknown objective '{}'", name),
            Self::UnknownMetric(name) => write!(f, "unknown metric '{}'", name),
        }
    }
}

impl std::error::Error for ConfigError {}
