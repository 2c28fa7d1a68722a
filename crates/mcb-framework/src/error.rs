//! Error types for registration, dispatch and user sessions.

use std::time::Duration;

use thiserror::Error;

use mcb_core::{ExtractError, SignatureError};

/// A boxed error returned by user handler code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Build Errors
// =============================================================================

/// Fatal registration errors. Any of these aborts the whole build.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The configuration supplied no bot settings marker.
    #[error("configuration carries no bot settings marker")]
    MissingConfiguration,

    /// A feedback entry names no known category.
    #[error("handler `{handler}`: unknown feedback category `{tag}`")]
    UnknownFeedback {
        /// The offending handler.
        handler: String,
        /// The tag as written.
        tag: String,
    },

    /// The handler's parameters could not be matched to its category.
    #[error("handler `{handler}` in category `{category}`: {source}")]
    Signature {
        /// The offending handler.
        handler: String,
        /// The category it was registered for.
        category: &'static str,
        /// The underlying resolution failure.
        #[source]
        source: SignatureError,
    },

    /// A user mapping was combined with inline invocation, which never
    /// reaches a per-user session.
    #[error("handler `{handler}`: a user mapping requires dedicated invocation")]
    InlineUserMapping {
        /// The offending handler.
        handler: String,
    },
}

impl BuildError {
    /// The signature failure behind this error, if any.
    pub fn signature_error(&self) -> Option<&SignatureError> {
        match self {
            Self::Signature { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for registry construction.
pub type BuildResult<T> = Result<T, BuildError>;

// =============================================================================
// Handler Errors
// =============================================================================

/// Failure of a single handler call.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A parameter could not be converted from its argument.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The handler was called with the wrong number of arguments.
    #[error(transparent)]
    Arity(#[from] SignatureError),

    /// The handler itself returned an error.
    #[error("{source}")]
    Failed {
        #[source]
        source: BoxError,
    },
}

impl HandlerError {
    /// Wraps an arbitrary error returned by handler code.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed { source: err.into() }
    }
}

/// Result type of every handler call.
pub type HandlerResult = Result<(), HandlerError>;

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors reported to the caller of a dispatch.
///
/// Only inline handlers can produce these. Failures inside detached handlers
/// are logged where they happen and never reach the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An inline handler failed.
    #[error("handler `{handler}` failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: HandlerError,
    },

    /// A reorderer received the wrong number of canonical arguments.
    ///
    /// Registration guarantees this cannot happen; seeing it is a bug.
    #[error("handler `{handler}` received malformed arguments: {source}")]
    Arguments {
        handler: String,
        #[source]
        source: SignatureError,
    },

    /// A double-dispatch listener hook failed.
    #[error("update listener `{hook}` failed: {source}")]
    Listener {
        hook: &'static str,
        #[source]
        source: BoxError,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

// =============================================================================
// Session Errors
// =============================================================================

/// Outcomes of a per-user task other than normal completion.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The task exceeded the mapping's timeout under the raise policy.
    #[error("task `{handler}` for user {user} timed out after {after:?}")]
    TimedOut {
        handler: String,
        user: i64,
        after: Duration,
    },

    /// The task was cancelled by an interrupt or by the session ending.
    #[error("task `{handler}` for user {user} was cancelled")]
    Cancelled { handler: String, user: i64 },

    /// The task panicked or was aborted by the runtime.
    #[error("task for user {user} aborted: {reason}")]
    Aborted { user: i64, reason: String },

    /// The handler itself failed.
    #[error("task `{handler}` for user {user} failed: {source}")]
    Handler {
        handler: String,
        user: i64,
        #[source]
        source: HandlerError,
    },
}

/// Result of one per-user task.
pub type SessionResult = Result<(), SessionError>;
