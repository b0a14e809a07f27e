//! Key-value session storage on an embedded `redb` database.
//!
//! # Layout
//!
//! | table | key | value |
//! |---|---|---|
//! | `sessions` | session id | property-array JSON |
//! | `session_shops` | session id | shop domain |
//! | `shop_sessions` (multimap) | shop domain | session ids |
//!
//! All three tables are updated in the same write transaction, so the shop
//! index never points at a missing session. redb is synchronous; every call
//! runs on the blocking thread pool.

use super::{SessionStorage, SessionStorageError};
use crate::auth::{Session, SessionError, SessionProperties};
use crate::config::ShopDomain;
use async_trait::async_trait;
use redb::{Database, MultimapTableDefinition, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions");
const SESSION_SHOPS: TableDefinition<&str, &str> = TableDefinition::new("session_shops");
const SHOP_SESSIONS: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("shop_sessions");

/// Session storage in a single `redb` file.
#[derive(Clone)]
pub struct KvSessionStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for KvSessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvSessionStorage").finish_non_exhaustive()
    }
}

impl KvSessionStorage {
    /// Opens (or creates) the database file at `path` and its tables.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStorageError::KeyValue`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SessionStorageError> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || -> Result<Database, redb::Error> {
            let db = Database::create(&path)?;
            let txn = db.begin_write()?;
            {
                txn.open_table(SESSIONS)?;
                txn.open_table(SESSION_SHOPS)?;
                txn.open_multimap_table(SHOP_SESSIONS)?;
            }
            txn.commit()?;
            tracing::debug!(path = %path.display(), "Opened key-value session store");
            Ok(db)
        })
        .await??;

        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, SessionStorageError>
    where
        F: FnOnce(&Database) -> Result<T, redb::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        Ok(tokio::task::spawn_blocking(move || op(&db)).await??)
    }
}

fn decode(json: &str) -> Result<Session, SessionStorageError> {
    let props: SessionProperties =
        serde_json::from_str(json).map_err(|e| SessionError::MalformedProperties {
            reason: e.to_string(),
        })?;
    Ok(Session::from_property_array(&props)?)
}

fn put(db: &Database, id: &str, shop: &str, json: &str) -> Result<(), redb::Error> {
    let txn = db.begin_write()?;
    {
        let mut sessions = txn.open_table(SESSIONS)?;
        let mut session_shops = txn.open_table(SESSION_SHOPS)?;
        let mut shop_sessions = txn.open_multimap_table(SHOP_SESSIONS)?;

        let previous_shop = session_shops.get(id)?.map(|guard| guard.value().to_string());
        if let Some(previous_shop) = previous_shop {
            shop_sessions.remove(previous_shop.as_str(), id)?;
        }

        sessions.insert(id, json)?;
        session_shops.insert(id, shop)?;
        shop_sessions.insert(shop, id)?;
    }
    txn.commit()?;
    Ok(())
}

fn get(db: &Database, id: &str) -> Result<Option<String>, redb::Error> {
    let txn = db.begin_read()?;
    let sessions = txn.open_table(SESSIONS)?;
    let json = sessions.get(id)?.map(|guard| guard.value().to_string());
    Ok(json)
}

fn remove(db: &Database, ids: &[String]) -> Result<(), redb::Error> {
    let txn = db.begin_write()?;
    {
        let mut sessions = txn.open_table(SESSIONS)?;
        let mut session_shops = txn.open_table(SESSION_SHOPS)?;
        let mut shop_sessions = txn.open_multimap_table(SHOP_SESSIONS)?;

        for id in ids {
            sessions.remove(id.as_str())?;
            let shop = session_shops
                .remove(id.as_str())?
                .map(|guard| guard.value().to_string());
            if let Some(shop) = shop {
                shop_sessions.remove(shop.as_str(), id.as_str())?;
            }
        }
    }
    txn.commit()?;
    Ok(())
}

fn get_by_shop(db: &Database, shop: &str) -> Result<Vec<String>, redb::Error> {
    let txn = db.begin_read()?;
    let shop_sessions = txn.open_multimap_table(SHOP_SESSIONS)?;
    let sessions = txn.open_table(SESSIONS)?;

    let mut found = Vec::new();
    for id in shop_sessions.get(shop)? {
        let id = id?;
        if let Some(json) = sessions.get(id.value())? {
            found.push(json.value().to_string());
        }
    }
    Ok(found)
}

#[async_trait]
impl SessionStorage for KvSessionStorage {
    async fn store_session(&self, session: &Session) -> Result<bool, SessionStorageError> {
        let json = serde_json::to_string(&session.to_property_array(true))?;
        let id = session.id.clone();
        let shop = session.shop.to_string();

        self.blocking(move |db| put(db, &id, &shop, &json)).await?;
        tracing::debug!(session_id = %session.id, "Stored session in key-value store");
        Ok(true)
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStorageError> {
        let id = id.to_string();
        let json = self.blocking(move |db| get(db, &id)).await?;
        json.as_deref().map(decode).transpose()
    }

    async fn delete_session(&self, id: &str) -> Result<bool, SessionStorageError> {
        self.delete_sessions(&[id.to_string()]).await
    }

    async fn delete_sessions(&self, ids: &[String]) -> Result<bool, SessionStorageError> {
        if ids.is_empty() {
            return Ok(true);
        }

        let ids = ids.to_vec();
        let count = ids.len();
        self.blocking(move |db| remove(db, &ids)).await?;
        tracing::debug!(count, "Deleted sessions from key-value store");
        Ok(true)
    }

    async fn find_sessions_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<Session>, SessionStorageError> {
        let shop = shop.to_string();
        let rows = self.blocking(move |db| get_by_shop(db, &shop)).await?;
        rows.iter().map(|json| decode(json)).collect()
    }
}
