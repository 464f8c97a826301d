//! Error types for Bidcraft.
//!
//! Library crates use [`BidcraftError`] via `thiserror`.
//! The server binary wraps this with `color-eyre` for startup diagnostics
//! and maps it onto HTTP status codes per request.

use std::path::PathBuf;

/// Top-level error type for all Bidcraft operations.
#[derive(Debug, thiserror::Error)]
pub enum BidcraftError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP failure talking to an external data API.
    #[error("{service} transport error: {message}")]
    Transport {
        /// Human-readable name of the remote service (e.g. `SAM.gov`).
        service: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        message: String,
    },

    /// Model call failed, returned a non-2xx status, or the stream aborted.
    #[error("provider error: {0}")]
    Provider(String),

    /// Model reply did not parse as JSON or did not match its contract.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Caller supplied an unusable request (missing input, malformed body).
    #[error("input error: {message}")]
    Input { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BidcraftError>;

impl BidcraftError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a transport error for `service`, optionally carrying the HTTP status.
    pub fn transport(service: impl Into<String>, status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            status,
            message: msg.into(),
        }
    }

    /// Create a provider error from any displayable message.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
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

    /// HTTP status reported by a remote data API, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}
