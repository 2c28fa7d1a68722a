//! Error types shared by the core engine.
//!
//! Build-time failures ([`SignatureError`]) are always configuration bugs and
//! abort registration. Extraction failures ([`ExtractError`]) surface at call
//! time when a handler receives a value it cannot accept.

use thiserror::Error;

// =============================================================================
// Signature Errors
// =============================================================================

/// Errors raised while matching handler signatures against canonical lists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// A type list used as a matching key contains the same type twice.
    #[error("duplicate context type `{ty}` in [{types}]")]
    DuplicateType {
        /// The repeated type.
        ty: &'static str,
        /// The full offending list.
        types: String,
    },

    /// No permutation of any subset of the pool satisfies the declaration.
    #[error("parameters ({declared}) cannot be satisfied by [{supported}]")]
    UnsupportedSignature {
        /// The declared parameter types.
        declared: String,
        /// The canonical types that are available.
        supported: String,
    },

    /// A canonical pool is too large for the exhaustive subset search.
    #[error("canonical pool of {len} types exceeds the maximum of {max}")]
    PoolTooLarge {
        /// Number of types in the rejected pool.
        len: usize,
        /// Largest pool a resolver accepts.
        max: usize,
    },

    /// A reorderer was applied to an argument list of the wrong length.
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Number of canonical arguments the reorderer was built for.
        expected: usize,
        /// Number of arguments actually supplied.
        got: usize,
    },
}

impl SignatureError {
    /// Returns `true` for [`SignatureError::DuplicateType`].
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateType { .. })
    }

    /// Returns `true` for [`SignatureError::UnsupportedSignature`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedSignature { .. })
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors that can occur while converting a context value into a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The supplied value has a different context type.
    #[error("context type mismatch: expected '{expected}', got '{got}'")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        got: &'static str,
    },

    /// No value was supplied for a declared parameter.
    #[error("no value supplied for parameter of type '{expected}'")]
    Missing {
        /// Expected type name.
        expected: &'static str,
    },
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for signature resolution and reordering.
pub type SignatureResult<T> = Result<T, SignatureError>;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by a bot session when calling the messaging provider.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The session is not connected to the provider.
    #[error("bot is not connected")]
    NotConnected,

    /// The provider rejected the request.
    #[error("API error ({code}): {description}")]
    Rejected {
        /// Provider error code.
        code: i32,
        /// Human-readable description.
        description: String,
    },

    /// The request could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
