//! Error type shared by all session storage backends.

use crate::auth::{AuthError, SessionError};
use crate::error::ConfigError;
use thiserror::Error;

/// Errors returned by [`SessionStorage`](super::SessionStorage) implementations.
///
/// Backend-specific failures are wrapped transparently so callers can still
/// inspect the driver error.
#[derive(Debug, Error)]
pub enum SessionStorageError {
    /// SQL driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded key-value store error.
    #[error("key-value store error: {0}")]
    KeyValue(#[from] redb::Error),

    /// A stored session could not be (de)serialized.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not describe a valid session.
    #[error("stored session is invalid: {0}")]
    InvalidSession(#[from] SessionError),

    /// Storage options are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A schema migration failed.
    #[error("migration '{name}' failed: {source}")]
    Migration {
        /// Name of the failed migration.
        name: &'static str,
        /// The underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The request could not be tied to a session.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// Verify SessionStorageError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionStorageError>();
};
