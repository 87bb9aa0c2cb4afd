//! Error types for the controller and its collaborators

use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external capability (validator, planner,
/// dispatcher, summarizer)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    pub kind: CollaboratorErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(kind: CollaboratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            CollaboratorErrorKind::Timeout,
            format!("attempt timed out after {}ms", after.as_millis()),
        )
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::Unavailable, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::RateLimit, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::Internal, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::InvalidResponse, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorErrorKind {
    /// Attempt exceeded its start-to-close timeout - retryable
    Timeout,
    /// Backend unreachable - retryable
    Unavailable,
    /// Throttled - retryable
    RateLimit,
    /// Unexpected failure inside the capability - retryable
    Internal,
    /// Request refused outright - not retryable
    Rejected,
    /// Response could not be interpreted - not retryable
    InvalidResponse,
}

impl CollaboratorErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Unavailable | Self::RateLimit | Self::Internal
        )
    }
}

/// Errors that end a session
///
/// Validation rejections and tool business failures are not represented
/// here: both are ordinary conversation content.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error("planner returned unrecognized next step {0:?}")]
    UnrecognizedNextStep(String),

    #[error("planner response is missing required field `{field}` ({context})")]
    MissingField {
        field: &'static str,
        context: String,
    },

    #[error("planner selected unknown tool {0:?}")]
    UnknownTool(String),

    #[error("{capability} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        capability: &'static str,
        attempts: u32,
        #[source]
        source: CollaboratorError,
    },

    #[error("{capability} failed: {source}")]
    Collaborator {
        capability: &'static str,
        #[source]
        source: CollaboratorError,
    },
}

/// Errors addressing sessions by id
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("unknown goal: {0}")]
    UnknownGoal(String),
}
