//! Error types for AgendaFetch.
//!
//! Library crates use [`AgendaFetchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all AgendaFetch operations.
#[derive(Debug, thiserror::Error)]
pub enum AgendaFetchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the storage backend.
    #[error("network error: {0}")]
    Network(String),

    /// The storage backend rejected a request.
    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    /// Credentials missing, unreadable, or refused.
    #[error("auth error: {0}")]
    Auth(String),

    /// HTML or response body parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Folder descent reached a container already on the current path.
    #[error("cycle detected: container {container_id} was already visited")]
    CycleDetected { container_id: String },

    /// Folder descent went deeper than the configured bound.
    #[error("descent from {container_id} exceeded max depth {max_depth}")]
    DepthExceeded { container_id: String, max_depth: u32 },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AgendaFetchError>;

impl AgendaFetchError {
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

    /// Whether this error is confined to a single folder reference.
    ///
    /// The pipeline skips the offending folder for these instead of aborting.
    pub fn is_folder_local(&self) -> bool {
        matches!(self, Self::CycleDetected { .. } | Self::DepthExceeded { .. })
    }
}
