//! Crate-wide error type.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors surfaced while building formatters or bootstrapping a backend.
///
/// Nothing on the request path returns this type: capture failures are
/// replaced by field defaults and handler panics become 500 responses.
#[derive(Debug, Error)]
pub enum Error {
    /// A format template could not be compiled.
    #[error("invalid format template at offset {offset}: {reason}")]
    Template { offset: usize, reason: String },

    /// A severity name that is not one of the known levels.
    #[error("unknown log level: {0}")]
    InvalidLevel(String),

    /// Configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The global `log` logger is owned by someone else.
    #[error("cannot install the log dispatcher: {0}")]
    Install(String),

    /// A sink could not be opened.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn template(offset: usize, reason: impl Into<String>) -> Self {
        Error::Template {
            offset,
            reason: reason.into(),
        }
    }
}
