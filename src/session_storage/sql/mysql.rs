//! MySQL session storage.

use super::{Dialect, SqlStorageOptions};
use crate::session_storage::SessionStorageError;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

/// Session storage in a MySQL table.
///
/// Upserts use `REPLACE INTO`. MySQL commits DDL implicitly, so a migration
/// whose second statement fails keeps its first; the migration is still left
/// unrecorded.
#[derive(Clone, Debug)]
pub struct MySqlSessionStorage {
    pool: MySqlPool,
    options: SqlStorageOptions,
}

impl MySqlSessionStorage {
    /// Connects to `url` with default table names.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStorageError::Database`] if the connection or schema
    /// setup fails, or [`SessionStorageError::Migration`] if a migration fails.
    pub async fn connect(url: &str) -> Result<Self, SessionStorageError> {
        Self::connect_with_options(url, SqlStorageOptions::default()).await
    }

    /// Connects to `url` using the given table names.
    ///
    /// # Errors
    ///
    /// See [`MySqlSessionStorage::connect`].
    pub async fn connect_with_options(
        url: &str,
        options: SqlStorageOptions,
    ) -> Result<Self, SessionStorageError> {
        let pool = MySqlPoolOptions::new().connect(url).await?;
        Self::with_pool(pool, options).await
    }
}

sql_backend!(MySqlSessionStorage, MySqlPool, Dialect::MySql, "mysql");
