//! Relational session storage.
//!
//! SQLite, PostgreSQL and MySQL share one table layout, one row type and one
//! migration runner; they differ only in SQL dialect.
//!
//! # Table layout
//!
//! | column | meaning |
//! |---|---|
//! | `id` | session id, primary key |
//! | `shop` | shop domain |
//! | `state` | OAuth state, empty when unset |
//! | `is_online` | online/offline flag |
//! | `scope` | comma-separated scopes |
//! | `expires` | expiry, epoch milliseconds |
//! | `access_token` | access token |
//! | `refresh_token`, `refresh_token_expires` | expiring offline tokens |
//! | `associated_user_scope`, `online_access_expires_in` | online access info |
//! | `user_id` ... `email_verified` | associated user |

#[macro_use]
mod backend;
pub mod migration;
mod mysql;
mod postgres;
mod sqlite;

pub use migration::{apply_migrations, SqlMigrator, MIGRATIONS};
pub use mysql::MySqlSessionStorage;
pub use postgres::PostgresSessionStorage;
pub use sqlite::SqliteSessionStorage;

use crate::auth::{PropertyValue, Session, SessionError, SessionProperties};
use crate::error::ConfigError;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

/// Default name of the session table.
pub const DEFAULT_SESSION_TABLE: &str = "shopify_sessions";

/// Default name of the table recording applied migrations.
pub const DEFAULT_MIGRATION_TABLE: &str = "shopify_sessions_migrations";

/// Columns in insert order.
const COLUMNS: [&str; 19] = [
    "id",
    "shop",
    "state",
    "is_online",
    "scope",
    "expires",
    "access_token",
    "refresh_token",
    "refresh_token_expires",
    "associated_user_scope",
    "online_access_expires_in",
    "user_id",
    "first_name",
    "last_name",
    "email",
    "account_owner",
    "locale",
    "collaborator",
    "email_verified",
];

/// Table names used by a SQL backend.
///
/// Names are spliced into SQL text, so they are restricted to plain
/// identifiers.
///
/// # Example
///
/// ```rust
/// use shopify_app_session::session_storage::SqlStorageOptions;
///
/// let options = SqlStorageOptions::new()
///     .session_table_name("app_sessions")
///     .unwrap();
/// assert_eq!(options.session_table(), "app_sessions");
/// assert!(SqlStorageOptions::new().session_table_name("x; DROP TABLE y").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlStorageOptions {
    session_table: String,
    migration_table: String,
}

impl Default for SqlStorageOptions {
    fn default() -> Self {
        Self {
            session_table: DEFAULT_SESSION_TABLE.to_string(),
            migration_table: DEFAULT_MIGRATION_TABLE.to_string(),
        }
    }
}

impl SqlStorageOptions {
    /// Creates options with the default table names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session table name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTableName`] if `name` is not a plain identifier.
    pub fn session_table_name(mut self, name: impl Into<String>) -> Result<Self, ConfigError> {
        self.session_table = validate_identifier(name.into())?;
        Ok(self)
    }

    /// Sets the migration table name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTableName`] if `name` is not a plain identifier.
    pub fn migration_table_name(mut self, name: impl Into<String>) -> Result<Self, ConfigError> {
        self.migration_table = validate_identifier(name.into())?;
        Ok(self)
    }

    /// Returns the session table name.
    #[must_use]
    pub fn session_table(&self) -> &str {
        &self.session_table
    }

    /// Returns the migration table name.
    #[must_use]
    pub fn migration_table(&self) -> &str {
        &self.migration_table
    }
}

fn validate_identifier(name: String) -> Result<String, ConfigError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(name)
    } else {
        Err(ConfigError::InvalidTableName { name })
    }
}

/// SQL dialect of a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// SQLite: `?` placeholders, `INSERT OR REPLACE`.
    Sqlite,
    /// PostgreSQL: `$n` placeholders, `ON CONFLICT DO UPDATE`.
    Postgres,
    /// MySQL: `?` placeholders, `REPLACE INTO`.
    MySql,
}

impl Dialect {
    /// Returns `count` comma-separated placeholders, numbered from 1.
    fn placeholders(self, count: usize) -> String {
        (1..=count)
            .map(|n| match self {
                Self::Postgres => format!("${n}"),
                Self::Sqlite | Self::MySql => "?".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn text_type(self, len: u16) -> String {
        match self {
            Self::Sqlite => "TEXT".to_string(),
            Self::Postgres | Self::MySql => format!("VARCHAR({len})"),
        }
    }

    fn bigint_type(self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER",
            Self::Postgres | Self::MySql => "BIGINT",
        }
    }

    /// `CREATE TABLE` for the current schema.
    pub(crate) fn create_session_table(self, table: &str) -> String {
        let text = self.text_type(255);
        let long_text = self.text_type(1024);
        let bigint = self.bigint_type();
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id {text} NOT NULL PRIMARY KEY,
                shop {text} NOT NULL,
                state {text} NOT NULL,
                is_online BOOLEAN NOT NULL,
                scope {long_text},
                expires {bigint},
                access_token {text},
                refresh_token {text},
                refresh_token_expires {bigint},
                associated_user_scope {long_text},
                online_access_expires_in {bigint},
                user_id {bigint},
                first_name {text},
                last_name {text},
                email {text},
                account_owner BOOLEAN,
                locale {text},
                collaborator BOOLEAN,
                email_verified BOOLEAN
            )"
        )
    }

    pub(crate) fn create_migration_table(self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (migration_name {} NOT NULL PRIMARY KEY)",
            self.text_type(255)
        )
    }

    /// Query returning the number of tables called `$1` (0 or 1).
    pub(crate) fn table_exists(self) -> &'static str {
        match self {
            Self::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            Self::Postgres => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
            Self::MySql => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
        }
    }

    pub(crate) fn upsert(self, table: &str) -> String {
        let columns = COLUMNS.join(", ");
        let values = self.placeholders(COLUMNS.len());
        match self {
            Self::Sqlite => format!("INSERT OR REPLACE INTO {table} ({columns}) VALUES ({values})"),
            Self::MySql => format!("REPLACE INTO {table} ({columns}) VALUES ({values})"),
            Self::Postgres => {
                let updates = COLUMNS[1..]
                    .iter()
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {table} ({columns}) VALUES ({values}) \
                     ON CONFLICT (id) DO UPDATE SET {updates}"
                )
            }
        }
    }

    pub(crate) fn select_by_id(self, table: &str) -> String {
        format!(
            "SELECT {} FROM {table} WHERE id = {}",
            COLUMNS.join(", "),
            self.placeholders(1)
        )
    }

    pub(crate) fn select_by_shop(self, table: &str) -> String {
        format!(
            "SELECT {} FROM {table} WHERE shop = {}",
            COLUMNS.join(", "),
            self.placeholders(1)
        )
    }

    pub(crate) fn delete_by_ids(self, table: &str, count: usize) -> String {
        format!(
            "DELETE FROM {table} WHERE id IN ({})",
            self.placeholders(count)
        )
    }

    pub(crate) fn count_migration(self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {table} WHERE migration_name = {}",
            self.placeholders(1)
        )
    }

    pub(crate) fn insert_migration(self, table: &str) -> String {
        format!(
            "INSERT INTO {table} (migration_name) VALUES ({})",
            self.placeholders(1)
        )
    }

    /// Statements implementing migration `name` against `table`.
    ///
    /// Unknown names and migrations that are no-ops for the dialect yield no
    /// statements.
    pub(crate) fn migration_statements(self, name: &str, table: &str) -> Vec<String> {
        let text = self.text_type(255);
        let long_text = self.text_type(1024);
        let bigint = self.bigint_type();

        match name {
            "migrate_scope_field_to_varchar_1024" => match self {
                // SQLite does not enforce VARCHAR lengths
                Self::Sqlite => Vec::new(),
                Self::Postgres => vec![format!(
                    "ALTER TABLE {table} ALTER COLUMN scope TYPE {long_text}"
                )],
                Self::MySql => vec![format!(
                    "ALTER TABLE {table} MODIFY COLUMN scope {long_text}"
                )],
            },
            "add_refresh_token_columns" => vec![
                format!("ALTER TABLE {table} ADD COLUMN refresh_token {text}"),
                format!("ALTER TABLE {table} ADD COLUMN refresh_token_expires {bigint}"),
            ],
            "add_online_access_info_columns" => vec![
                format!("ALTER TABLE {table} ADD COLUMN associated_user_scope {long_text}"),
                format!("ALTER TABLE {table} ADD COLUMN online_access_expires_in {bigint}"),
            ],
            _ => Vec::new(),
        }
    }
}

/// One row of the session table.
#[derive(Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct SessionRow {
    id: String,
    shop: String,
    state: String,
    is_online: bool,
    scope: Option<String>,
    expires: Option<i64>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    refresh_token_expires: Option<i64>,
    associated_user_scope: Option<String>,
    online_access_expires_in: Option<i64>,
    user_id: Option<i64>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    account_owner: Option<bool>,
    locale: Option<String>,
    collaborator: Option<bool>,
    email_verified: Option<bool>,
}

impl SessionRow {
    /// Binds the row's values to `query` in [`COLUMNS`] order.
    pub(crate) fn bind<'q, DB>(
        self,
        query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    ) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
    where
        DB: Database,
        String: Encode<'q, DB> + Type<DB>,
        bool: Encode<'q, DB> + Type<DB>,
        Option<String>: Encode<'q, DB> + Type<DB>,
        Option<i64>: Encode<'q, DB> + Type<DB>,
        Option<bool>: Encode<'q, DB> + Type<DB>,
    {
        query
            .bind(self.id)
            .bind(self.shop)
            .bind(self.state)
            .bind(self.is_online)
            .bind(self.scope)
            .bind(self.expires)
            .bind(self.access_token)
            .bind(self.refresh_token)
            .bind(self.refresh_token_expires)
            .bind(self.associated_user_scope)
            .bind(self.online_access_expires_in)
            .bind(self.user_id)
            .bind(self.first_name)
            .bind(self.last_name)
            .bind(self.email)
            .bind(self.account_owner)
            .bind(self.locale)
            .bind(self.collaborator)
            .bind(self.email_verified)
    }

    /// Converts the row back into a session, validating it on the way.
    pub(crate) fn into_session(self) -> Result<Session, SessionError> {
        fn text(props: &mut SessionProperties, key: &str, value: Option<String>) {
            if let Some(value) = value {
                props.push((key.to_string(), PropertyValue::Text(value)));
            }
        }
        fn number(props: &mut SessionProperties, key: &str, value: Option<i64>) {
            if let Some(value) = value {
                props.push((key.to_string(), PropertyValue::Number(value)));
            }
        }
        fn flag(props: &mut SessionProperties, key: &str, value: Option<bool>) {
            if let Some(value) = value {
                props.push((key.to_string(), PropertyValue::Bool(value)));
            }
        }

        let mut props = SessionProperties::new();
        text(&mut props, "id", Some(self.id));
        text(&mut props, "shop", Some(self.shop));
        text(&mut props, "state", Some(self.state).filter(|s| !s.is_empty()));
        flag(&mut props, "isOnline", Some(self.is_online));
        text(&mut props, "scope", self.scope);
        number(&mut props, "expires", self.expires);
        text(&mut props, "accessToken", self.access_token);
        text(&mut props, "refreshToken", self.refresh_token);
        number(&mut props, "refreshTokenExpires", self.refresh_token_expires);
        number(&mut props, "userId", self.user_id);
        text(&mut props, "firstName", self.first_name);
        text(&mut props, "lastName", self.last_name);
        text(&mut props, "email", self.email);
        flag(&mut props, "accountOwner", self.account_owner);
        text(&mut props, "locale", self.locale);
        flag(&mut props, "collaborator", self.collaborator);
        flag(&mut props, "emailVerified", self.email_verified);
        text(&mut props, "associatedUserScope", self.associated_user_scope);
        number(&mut props, "onlineAccessExpiresIn", self.online_access_expires_in);

        Session::from_property_array(&props)
    }
}

impl TryFrom<&Session> for SessionRow {
    type Error = SessionError;

    /// Fails for user ids that do not fit the signed `user_id` column.
    fn try_from(session: &Session) -> Result<Self, Self::Error> {
        let mut row = Self {
            id: session.id.clone(),
            shop: session.shop.to_string(),
            state: session.state.clone().unwrap_or_default(),
            is_online: session.is_online,
            scope: session.scopes.to_stored(),
            expires: session.expires.map(|e| e.timestamp_millis()),
            access_token: Some(session.access_token.clone()).filter(|t| !t.is_empty()),
            refresh_token: session.refresh_token.clone(),
            refresh_token_expires: session.refresh_token_expires.map(|e| e.timestamp_millis()),
            ..Self::default()
        };

        if let Some(info) = &session.online_access_info {
            let user = &info.associated_user;
            row.associated_user_scope = info.associated_user_scope.to_stored();
            row.online_access_expires_in = Some(info.expires_in);
            row.user_id = Some(i64::try_from(user.id).map_err(|_| {
                SessionError::InvalidProperty {
                    property: "userId".to_string(),
                    reason: format!("user id {} does not fit a BIGINT column", user.id),
                }
            })?);
            row.first_name = Some(user.first_name.clone());
            row.last_name = Some(user.last_name.clone());
            row.email = Some(user.email.clone());
            row.account_owner = Some(user.account_owner);
            row.locale = Some(user.locale.clone());
            row.collaborator = Some(user.collaborator);
            row.email_verified = Some(user.email_verified);
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AssociatedUser, OnlineAccessInfo};
    use crate::config::ShopDomain;
    use chrono::{DateTime, Utc};

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("shopify_sessions".to_string()).is_ok());
        assert!(validate_identifier("_t1".to_string()).is_ok());
        assert!(validate_identifier(String::new()).is_err());
        assert!(validate_identifier("1table".to_string()).is_err());
        assert!(validate_identifier("my-table".to_string()).is_err());
        assert!(validate_identifier("t; DROP TABLE x".to_string()).is_err());
    }

    #[test]
    fn test_options_defaults() {
        let options = SqlStorageOptions::new();
        assert_eq!(options.session_table(), "shopify_sessions");
        assert_eq!(options.migration_table(), "shopify_sessions_migrations");
    }

    #[test]
    fn test_placeholders_per_dialect() {
        assert_eq!(Dialect::Sqlite.placeholders(3), "?, ?, ?");
        assert_eq!(Dialect::MySql.placeholders(2), "?, ?");
        assert_eq!(Dialect::Postgres.placeholders(3), "$1, $2, $3");
    }

    #[test]
    fn test_upsert_dialects() {
        assert!(Dialect::Sqlite
            .upsert("t")
            .starts_with("INSERT OR REPLACE INTO t (id, shop,"));
        assert!(Dialect::MySql.upsert("t").starts_with("REPLACE INTO t"));

        let pg = Dialect::Postgres.upsert("t");
        assert!(pg.contains("$19)"));
        assert!(pg.contains("ON CONFLICT (id) DO UPDATE SET shop = EXCLUDED.shop"));
        assert!(!pg.contains("id = EXCLUDED.id"));
    }

    #[test]
    fn test_delete_by_ids() {
        assert_eq!(
            Dialect::Postgres.delete_by_ids("t", 2),
            "DELETE FROM t WHERE id IN ($1, $2)"
        );
    }

    #[test]
    fn test_migration_statements() {
        assert!(Dialect::Sqlite
            .migration_statements("migrate_scope_field_to_varchar_1024", "t")
            .is_empty());
        assert_eq!(
            Dialect::MySql.migration_statements("migrate_scope_field_to_varchar_1024", "t"),
            vec!["ALTER TABLE t MODIFY COLUMN scope VARCHAR(1024)".to_string()]
        );
        assert_eq!(
            Dialect::Postgres
                .migration_statements("add_refresh_token_columns", "t")
                .len(),
            2
        );
        assert!(Dialect::Postgres.migration_statements("unknown", "t").is_empty());
        for name in MIGRATIONS {
            assert!(!Dialect::MySql.migration_statements(name, "t").is_empty());
        }
    }

    #[test]
    fn test_row_conversion_preserves_online_session() {
        let shop = ShopDomain::new("my-store").unwrap();
        let session = Session::new(
            Session::generate_online_id(&shop, 9),
            shop,
            "token".to_string(),
            "read_products".parse().unwrap(),
            true,
            DateTime::<Utc>::from_timestamp_millis(1_800_000_000_000),
        )
        .with_state("state-1")
        .with_refresh_token("refresh", DateTime::<Utc>::from_timestamp_millis(1_900_000_000_000))
        .with_online_access_info(OnlineAccessInfo::new(
            AssociatedUser::new(
                9,
                "Jo".to_string(),
                "Li".to_string(),
                "jo@example.com".to_string(),
                false,
                true,
                "de".to_string(),
                true,
            ),
            "read_products".parse().unwrap(),
            120,
        ));

        let row = SessionRow::try_from(&session).unwrap();
        assert_eq!(row.expires, Some(1_800_000_000_000));
        assert_eq!(row.user_id, Some(9));

        assert_eq!(row.into_session().unwrap(), session);
    }

    #[test]
    fn test_row_conversion_rejects_user_id_outside_bigint() {
        let shop = ShopDomain::new("my-store").unwrap();
        let session = Session::new(
            "my-store.myshopify.com_big".to_string(),
            shop,
            "token".to_string(),
            crate::auth::AuthScopes::new(),
            true,
            None,
        )
        .with_online_access_info(OnlineAccessInfo::new(
            AssociatedUser::with_id(u64::MAX),
            crate::auth::AuthScopes::new(),
            60,
        ));

        let result = SessionRow::try_from(&session);
        assert!(matches!(
            result,
            Err(SessionError::InvalidProperty { ref property, .. }) if property == "userId"
        ));
    }

    #[test]
    fn test_row_conversion_of_minimal_offline_session() {
        let shop = ShopDomain::new("my-store").unwrap();
        let session = Session::new(
            Session::generate_offline_id(&shop),
            shop,
            String::new(),
            crate::auth::AuthScopes::new(),
            false,
            None,
        );

        let row = SessionRow::try_from(&session).unwrap();
        assert_eq!(row.state, "");
        assert_eq!(row.scope, None);
        assert_eq!(row.access_token, None);

        let restored = row.into_session().unwrap();
        assert_eq!(restored, session);
        assert!(restored.state.is_none());
        assert!(restored.online_access_info.is_none());
    }
}
