//! Error types for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings file")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The settings file was not valid TOML.
    #[error("failed to parse settings file")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A connection entry failed validation.
    #[error("invalid connection at index {index}: {reason}")]
    InvalidConnection {
        /// Index of the offending connection.
        index: usize,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The primary index does not point at a configured connection.
    #[error("primary index {index} is out of range for {len} connections")]
    PrimaryOutOfRange {
        /// Configured primary index.
        index: usize,
        /// Number of configured connections.
        len: usize,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
