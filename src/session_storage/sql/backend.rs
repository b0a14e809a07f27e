//! Code shared by the SQL backends.
//!
//! Each backend owns a pool and [`SqlStorageOptions`](super::SqlStorageOptions);
//! everything past connecting only differs in the pool type and [`Dialect`],
//! so the inherent helpers and both trait impls are generated here.
//!
//! [`Dialect`]: super::Dialect

/// Implements `with_pool`, accessors, schema init, [`SqlMigrator`] and
/// [`SessionStorage`] for a backend struct with `pool` and `options` fields.
///
/// [`SqlMigrator`]: super::SqlMigrator
/// [`SessionStorage`]: crate::session_storage::SessionStorage
macro_rules! sql_backend {
    ($storage:ident, $pool:ty, $dialect:expr, $backend:literal) => {
        impl $storage {
            /// Wraps an existing pool, creating the tables and applying
            /// pending migrations.
            ///
            /// # Errors
            ///
            /// Returns [`SessionStorageError::Database`] if the schema cannot be
            /// created, or [`SessionStorageError::Migration`] if a migration
            /// fails.
            ///
            /// [`SessionStorageError::Database`]: crate::session_storage::SessionStorageError::Database
            /// [`SessionStorageError::Migration`]: crate::session_storage::SessionStorageError::Migration
            pub async fn with_pool(
                pool: $pool,
                options: $crate::session_storage::sql::SqlStorageOptions,
            ) -> Result<Self, $crate::session_storage::SessionStorageError> {
                let storage = Self { pool, options };
                storage.init().await?;
                Ok(storage)
            }

            /// Returns the underlying pool.
            #[must_use]
            pub const fn pool(&self) -> &$pool {
                &self.pool
            }

            /// Returns the table names in use.
            #[must_use]
            pub const fn options(&self) -> &$crate::session_storage::sql::SqlStorageOptions {
                &self.options
            }

            async fn init(&self) -> Result<(), $crate::session_storage::SessionStorageError> {
                let table = self.options.session_table();

                let existing: i64 = ::sqlx::query_scalar($dialect.table_exists())
                    .bind(table)
                    .fetch_one(&self.pool)
                    .await?;

                let create = $dialect.create_session_table(table);
                ::sqlx::query(&create).execute(&self.pool).await?;

                let run =
                    $crate::session_storage::sql::apply_migrations(self, existing == 0).await?;
                ::tracing::debug!(
                    backend = $backend,
                    table,
                    migrations_run = run,
                    "Initialized session table"
                );
                Ok(())
            }
        }

        #[::async_trait::async_trait]
        impl $crate::session_storage::sql::SqlMigrator for $storage {
            async fn create_migration_table(
                &self,
            ) -> Result<(), $crate::session_storage::SessionStorageError> {
                let sql = $dialect.create_migration_table(self.options.migration_table());
                ::sqlx::query(&sql).execute(&self.pool).await?;
                Ok(())
            }

            async fn is_migration_applied(
                &self,
                name: &str,
            ) -> Result<bool, $crate::session_storage::SessionStorageError> {
                let sql = $dialect.count_migration(self.options.migration_table());
                let count: i64 = ::sqlx::query_scalar(&sql)
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(count > 0)
            }

            async fn record_migration(
                &self,
                name: &str,
            ) -> Result<(), $crate::session_storage::SessionStorageError> {
                let sql = $dialect.insert_migration(self.options.migration_table());
                ::sqlx::query(&sql).bind(name).execute(&self.pool).await?;
                Ok(())
            }

            async fn run_migration(
                &self,
                name: &'static str,
            ) -> Result<(), $crate::session_storage::SessionStorageError> {
                let failed = move |source| $crate::session_storage::SessionStorageError::Migration {
                    name,
                    source,
                };

                let mut tx = self.pool.begin().await.map_err(failed)?;
                for statement in $dialect.migration_statements(name, self.options.session_table())
                {
                    ::sqlx::query(&statement)
                        .execute(&mut *tx)
                        .await
                        .map_err(failed)?;
                }

                let record = $dialect.insert_migration(self.options.migration_table());
                ::sqlx::query(&record)
                    .bind(name)
                    .execute(&mut *tx)
                    .await
                    .map_err(failed)?;
                tx.commit().await.map_err(failed)?;
                Ok(())
            }
        }

        #[::async_trait::async_trait]
        impl $crate::session_storage::SessionStorage for $storage {
            async fn store_session(
                &self,
                session: &$crate::auth::Session,
            ) -> Result<bool, $crate::session_storage::SessionStorageError> {
                let row = $crate::session_storage::sql::SessionRow::try_from(session)?;
                let sql = $dialect.upsert(self.options.session_table());
                row.bind(::sqlx::query(&sql)).execute(&self.pool).await?;
                ::tracing::debug!(backend = $backend, session_id = %session.id, "Stored session");
                Ok(true)
            }

            async fn load_session(
                &self,
                id: &str,
            ) -> Result<Option<$crate::auth::Session>, $crate::session_storage::SessionStorageError>
            {
                let sql = $dialect.select_by_id(self.options.session_table());
                let row = ::sqlx::query_as::<_, $crate::session_storage::sql::SessionRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row
                    .map($crate::session_storage::sql::SessionRow::into_session)
                    .transpose()?)
            }

            async fn delete_session(
                &self,
                id: &str,
            ) -> Result<bool, $crate::session_storage::SessionStorageError> {
                self.delete_sessions(&[id.to_string()]).await
            }

            async fn delete_sessions(
                &self,
                ids: &[String],
            ) -> Result<bool, $crate::session_storage::SessionStorageError> {
                if ids.is_empty() {
                    return Ok(true);
                }

                let sql = $dialect.delete_by_ids(self.options.session_table(), ids.len());
                let mut query = ::sqlx::query(&sql);
                for id in ids {
                    query = query.bind(id.as_str());
                }
                let result = query.execute(&self.pool).await?;
                ::tracing::debug!(
                    backend = $backend,
                    deleted = result.rows_affected(),
                    "Deleted sessions"
                );
                Ok(true)
            }

            async fn find_sessions_by_shop(
                &self,
                shop: &$crate::config::ShopDomain,
            ) -> Result<Vec<$crate::auth::Session>, $crate::session_storage::SessionStorageError>
            {
                let sql = $dialect.select_by_shop(self.options.session_table());
                let rows = ::sqlx::query_as::<_, $crate::session_storage::sql::SessionRow>(&sql)
                    .bind(shop.to_string())
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows
                    .into_iter()
                    .map($crate::session_storage::sql::SessionRow::into_session)
                    .collect::<Result<_, _>>()?)
            }
        }
    };
}
