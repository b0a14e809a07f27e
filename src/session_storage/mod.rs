//! Pluggable session persistence.
//!
//! Every backend implements [`SessionStorage`], an object-safe async trait, so
//! apps can hold an `Arc<dyn SessionStorage>` and swap backends through
//! configuration.
//!
//! # Backends
//!
//! - [`MemorySessionStorage`]: process-local, for tests and development
//! - [`KvSessionStorage`]: embedded `redb` key-value file
//! - [`SqliteSessionStorage`], [`PostgresSessionStorage`],
//!   [`MySqlSessionStorage`]: relational tables with a migration runner
//!
//! # Semantics
//!
//! Writes are upserts keyed by session id; the last write wins. No backend
//! adds locking, caching or expiry of its own: expired sessions stay stored
//! until deleted.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::{Session, ShopDomain};
//! use shopify_app_session::session_storage::{MemorySessionStorage, SessionStorage};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let storage = MemorySessionStorage::new();
//! let shop = ShopDomain::new("my-store").unwrap();
//! let session = Session::new(
//!     Session::generate_offline_id(&shop),
//!     shop,
//!     "access-token".to_string(),
//!     "read_products".parse().unwrap(),
//!     false,
//!     None,
//! );
//!
//! storage.store_session(&session).await.unwrap();
//! let loaded = storage.load_session(&session.id).await.unwrap();
//! assert_eq!(loaded, Some(session));
//! # });
//! ```

mod error;
pub mod kv;
pub mod memory;
pub mod sql;

pub use error::SessionStorageError;
pub use kv::KvSessionStorage;
pub use memory::MemorySessionStorage;
pub use sql::{
    MySqlSessionStorage, PostgresSessionStorage, SqlStorageOptions, SqliteSessionStorage,
};

use crate::auth::{current_session_id, RequestHeaders, Session};
use crate::config::{ShopDomain, ShopifyConfig};
use async_trait::async_trait;

/// Persistence interface for [`Session`]s.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Creates or replaces the session with `session.id`.
    ///
    /// Returns `true` once the session is stored.
    async fn store_session(&self, session: &Session) -> Result<bool, SessionStorageError>;

    /// Loads the session with `id`, if stored.
    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStorageError>;

    /// Deletes the session with `id`.
    ///
    /// Returns `true` whether or not the session existed.
    async fn delete_session(&self, id: &str) -> Result<bool, SessionStorageError>;

    /// Deletes every session in `ids`. An empty slice is a no-op.
    async fn delete_sessions(&self, ids: &[String]) -> Result<bool, SessionStorageError>;

    /// Returns all sessions stored for `shop`, online and offline.
    async fn find_sessions_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<Session>, SessionStorageError>;
}

/// Loads the session the request belongs to.
///
/// Resolves the id with [`current_session_id`] and loads it from `storage`.
/// Returns `None` when the request carries no session or the session is not
/// stored; whether a loaded session is still usable is left to
/// [`Session::is_active_with_scopes`].
///
/// # Errors
///
/// Returns [`SessionStorageError::Auth`] if the request's credentials are
/// invalid, or the backend's error if loading fails.
pub async fn load_current_session(
    config: &ShopifyConfig,
    storage: &dyn SessionStorage,
    headers: &RequestHeaders,
    is_online: bool,
) -> Result<Option<Session>, SessionStorageError> {
    let Some(id) = current_session_id(config, headers, is_online)? else {
        tracing::debug!("Request carries no session id");
        return Ok(None);
    };

    let session = storage.load_session(&id).await?;
    if session.is_none() {
        tracing::debug!(session_id = %id, "No stored session for request");
    }
    Ok(session)
}
