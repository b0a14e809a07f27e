//! Error types for session tokens, session ids and session decoding.
//!
//! - [`AuthError`]: a request could not be tied to a session id
//! - [`SessionError`]: a persisted session could not be reconstructed
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::auth::AuthError;
//!
//! let error = AuthError::InvalidJwt {
//!     reason: "Session token had invalid API key".to_string(),
//! };
//! assert!(error.to_string().contains("invalid API key"));
//! ```

use thiserror::Error;

/// Errors raised while resolving the session id of an incoming request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The session token failed signature, time or audience validation.
    #[error("Invalid session token: {reason}")]
    InvalidJwt {
        /// Why the token was rejected.
        reason: String,
    },

    /// An `Authorization` header was present but did not hold a bearer token.
    #[error("Missing Bearer token in authorization header")]
    MissingBearerToken,
}

/// Errors raised while rebuilding a [`Session`](crate::Session) from its
/// persisted property array.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A property every session must have is absent.
    #[error("Session property '{property}' is required")]
    MissingProperty {
        /// The missing property key.
        property: &'static str,
    },

    /// A property holds a value of the wrong shape.
    #[error("Invalid value for session property '{property}': {reason}")]
    InvalidProperty {
        /// The offending property key.
        property: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Stored data is not a property array at all.
    #[error("Malformed session property array: {reason}")]
    MalformedProperties {
        /// Why the data could not be read.
        reason: String,
    },
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AuthError>();
    assert_send_sync::<SessionError>();
};
