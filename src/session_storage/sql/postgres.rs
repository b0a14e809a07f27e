//! PostgreSQL session storage.

use super::{Dialect, SqlStorageOptions};
use crate::session_storage::SessionStorageError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Session storage in a PostgreSQL table.
///
/// Upserts use `ON CONFLICT (id) DO UPDATE`. Migrations run inside a
/// transaction, so a failed one leaves the table untouched.
#[derive(Clone, Debug)]
pub struct PostgresSessionStorage {
    pool: PgPool,
    options: SqlStorageOptions,
}

impl PostgresSessionStorage {
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
    /// See [`PostgresSessionStorage::connect`].
    pub async fn connect_with_options(
        url: &str,
        options: SqlStorageOptions,
    ) -> Result<Self, SessionStorageError> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Self::with_pool(pool, options).await
    }
}

sql_backend!(PostgresSessionStorage, PgPool, Dialect::Postgres, "postgres");
