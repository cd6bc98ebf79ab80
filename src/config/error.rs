//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during settings loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A numeric or boolean setting could not be parsed.
    #[error("failed to parse {name}='{value}'")]
    InvalidValue { name: &'static str, value: String },

    /// A threshold fell outside `[0, 1]`.
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    /// A count setting that must be positive was zero.
    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },

    /// The detector model size is not one of `n`, `s`, `m`, `l`, `x`.
    #[error("unknown logo model size '{value}' (expected one of n, s, m, l, x)")]
    InvalidModelSize { value: String },

    /// The `.env` file exists but could not be read or parsed.
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
