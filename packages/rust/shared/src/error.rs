//! Error types for Brochurizer.
//!
//! Library crates use [`BrochureError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Brochurizer operations.
#[derive(Debug, thiserror::Error)]
pub enum BrochureError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page.
    #[error("network error: {0}")]
    Network(String),

    /// The link-selection response was not the expected JSON document.
    #[error("parse links as JSON failed: {message}")]
    LinkParse { message: String },

    /// Language model call failed (transport, API status, or stream decoding).
    #[error("language model error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad URL, unsupported language, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BrochureError>;

impl BrochureError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a link-selection parse error.
    pub fn link_parse(msg: impl Into<String>) -> Self {
        Self::LinkParse {
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

    /// Whether re-running the whole flow from URL entry is a sensible reaction.
    ///
    /// Model-side failures and configuration problems are treated as unexpected.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LinkParse { .. } | Self::Validation { .. } | Self::Network(_) | Self::Io { .. } => {
                true
            }
            Self::Config { .. } | Self::Llm(_) => false,
        }
    }
}
