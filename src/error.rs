//! Error types for rule compilation, resolution and the analyzer boundary.

use thiserror::Error;

/// Errors surfaced by the tagger.
///
/// Rule errors are raised while a [`RuleSet`](crate::RuleSet) is built, before
/// any document is processed. Everything else aborts the current document.
#[derive(Debug, Error)]
pub enum Error {
    /// A rule or word class is malformed (unknown class, empty pattern, ...).
    #[error("invalid rule '{rule}': {message}")]
    Rule { rule: String, message: String },

    /// Resolution was requested without any computation model selected.
    #[error("no computation model selected for resolution")]
    MissingModel,

    /// The reference (document creation) time could not be parsed.
    #[error("invalid reference time '{0}'")]
    Reference(String),

    /// An inner token cannot be mapped back to an external token position.
    #[error("token {token} ('{surface}') has no external position")]
    Unmapped { token: usize, surface: String },

    /// The external morphological analyzer exited unsuccessfully.
    #[error("morphological analyzer exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    Input(String),
}

/// Result type for tagger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Rule { rule: rule.into(), message: message.into() }
    }
}
