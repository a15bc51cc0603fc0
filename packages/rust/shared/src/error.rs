//! Error types for the inventory pipeline.
//!
//! Library crates use [`InventoryError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Most variants never escape a pipeline stage: each stage catches its own
//! failures and takes a fallback path. Only infrastructure faults (for
//! example an HTTP client that cannot be built) reach the caller.

use std::path::PathBuf;

/// Top-level error type for all inventory operations.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error: timeout, refused connection, or non-2xx status.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed sitemap XML or an unparseable classification response.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A collaborator (classification, fetch, search) returned an error or an
    /// unusable result.
    #[error("service error: {0}")]
    Service(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad domain, invalid URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InventoryError>;

impl InventoryError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Timeout of an external call, reported as a network failure.
    pub fn timeout(what: impl std::fmt::Display, secs: u64) -> Self {
        Self::Network(format!("{what}: timed out after {secs}s"))
    }
}
