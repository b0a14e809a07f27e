//! Schema migrations for the SQL backends.
//!
//! Migrations are identified by name and recorded in a migration table once
//! applied, so running the migrator again is a no-op. A session table created
//! from scratch already has the latest layout: its migrations are recorded
//! without being run.

use crate::session_storage::SessionStorageError;
use async_trait::async_trait;

/// Known migrations, in the order they are applied.
pub const MIGRATIONS: &[&str] = &[
    "migrate_scope_field_to_varchar_1024",
    "add_refresh_token_columns",
    "add_online_access_info_columns",
];

/// Backend hooks used by [`apply_migrations`].
#[async_trait]
pub trait SqlMigrator: Send + Sync {
    /// Creates the migration table if it does not exist.
    async fn create_migration_table(&self) -> Result<(), SessionStorageError>;

    /// Returns `true` if `name` is recorded as applied.
    async fn is_migration_applied(&self, name: &str) -> Result<bool, SessionStorageError>;

    /// Records `name` as applied.
    async fn record_migration(&self, name: &str) -> Result<(), SessionStorageError>;

    /// Runs the statements of migration `name` against the session table and
    /// records it, in one transaction.
    ///
    /// On failure nothing is recorded and, where the database supports
    /// transactional DDL, no statement of the migration remains applied.
    async fn run_migration(&self, name: &'static str) -> Result<(), SessionStorageError>;
}

/// Brings the session table up to date.
///
/// With `fresh_schema` (the session table was just created) every pending
/// migration is recorded without running. Returns the number of migrations
/// actually run.
///
/// # Errors
///
/// Returns the first error raised by `migrator`; migrations after a failed
/// one are not attempted.
pub async fn apply_migrations<M>(
    migrator: &M,
    fresh_schema: bool,
) -> Result<usize, SessionStorageError>
where
    M: SqlMigrator + ?Sized,
{
    migrator.create_migration_table().await?;

    let mut run = 0;
    for &name in MIGRATIONS {
        if migrator.is_migration_applied(name).await? {
            continue;
        }

        if fresh_schema {
            tracing::debug!(migration = name, "Recording migration for fresh schema");
            migrator.record_migration(name).await?;
        } else {
            tracing::info!(migration = name, "Running session table migration");
            migrator.run_migration(name).await?;
            run += 1;
        }
    }

    Ok(run)
}
