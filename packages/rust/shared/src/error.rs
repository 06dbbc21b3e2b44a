//! Error types for personlink.
//!
//! Library crates use [`PersonLinkError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all personlink operations.
#[derive(Debug, thiserror::Error)]
pub enum PersonLinkError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The page has no person summary (infobox) or could not be fetched.
    #[error("person not found at {url}")]
    PersonNotFound { url: String },

    /// A traversal listener rejected an event.
    #[error("listener '{listener}' failed: {message}")]
    Listener { listener: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PersonLinkError>;

impl PersonLinkError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn person_not_found(url: impl Into<String>) -> Self {
        Self::PersonNotFound { url: url.into() }
    }

    pub fn listener(listener: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Listener {
            listener: listener.into(),
            message: msg.into(),
        }
    }

    /// Whether this error means "the page is not a person page".
    pub fn is_person_not_found(&self) -> bool {
        matches!(self, Self::PersonNotFound { .. })
    }
}
