//! Unified error types for Hookbus.
//!
//! Both crates map their failures into [`HubError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A public method was called with an invalid argument (bad event name,
    /// empty name string, etc.).
    InvalidArgument,
    /// A hooked function was given a context that is not a JSON object.
    InvalidContext,
    /// A dispatch chain reached a state it cannot proceed from, detected
    /// lazily at dispatch time.
    InvalidState,
    /// A listener (or wrapped function) failed; the chain rejects with this.
    Listener,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::InvalidContext => write!(f, "INVALID_CONTEXT"),
            Self::InvalidState => write!(f, "INVALID_STATE"),
            Self::Listener => write!(f, "LISTENER"),
        }
    }
}

/// The unified error used throughout Hookbus.
///
/// Validation failures are returned synchronously from the registration and
/// emission methods; errors raised inside listeners reject the chain's
/// future. Both travel as `HubError`.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct HubError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HubError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an invalid-context error.
    pub fn invalid_context(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidContext, message)
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// Create a listener error.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Listener, message)
    }
}

impl Clone for HubError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::InvalidArgument,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}
