//! SQLite session storage.

use super::{Dialect, SqlStorageOptions};
use crate::session_storage::SessionStorageError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Session storage in a SQLite table.
///
/// The table and the migration table are created, and pending migrations
/// applied, when the storage is constructed. Upserts use
/// `INSERT OR REPLACE`.
///
/// # Example
///
/// ```rust,no_run
/// use shopify_app_session::session_storage::SqliteSessionStorage;
///
/// # async fn run() -> Result<(), shopify_app_session::session_storage::SessionStorageError> {
/// let storage = SqliteSessionStorage::connect("sqlite://sessions.db").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SqliteSessionStorage {
    pool: SqlitePool,
    options: SqlStorageOptions,
}

impl SqliteSessionStorage {
    /// Opens the database at `url` (created if missing) with default table names.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStorageError::Database`] if the database cannot be
    /// opened or initialized, or [`SessionStorageError::Migration`] if a
    /// migration fails.
    pub async fn connect(url: &str) -> Result<Self, SessionStorageError> {
        Self::connect_with_options(url, SqlStorageOptions::default()).await
    }

    /// Opens the database at `url` using the given table names.
    ///
    /// # Errors
    ///
    /// See [`SqliteSessionStorage::connect`].
    pub async fn connect_with_options(
        url: &str,
        options: SqlStorageOptions,
    ) -> Result<Self, SessionStorageError> {
        let connect_options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(connect_options)
            .await?;
        Self::with_pool(pool, options).await
    }
}

sql_backend!(SqliteSessionStorage, SqlitePool, Dialect::Sqlite, "sqlite");
