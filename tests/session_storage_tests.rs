//! Behavior shared by every `SessionStorage` backend.
//!
//! Each scenario runs against the in-memory store, the embedded key-value
//! store and an in-memory SQLite database. PostgreSQL and MySQL use the same
//! row mapping as SQLite and need a live server, so they are not run here.

use chrono::{DateTime, Utc};
use shopify_app_session::session_storage::{
    KvSessionStorage, MemorySessionStorage, SqlStorageOptions, SqliteSessionStorage,
};
use shopify_app_session::{
    AssociatedUser, OnlineAccessInfo, Session, SessionStorage, ShopDomain,
};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

struct Backends {
    storages: Vec<(&'static str, Box<dyn SessionStorage>)>,
    // Keeps the key-value file alive for the test
    _dir: TempDir,
}

async fn sqlite_storage(options: SqlStorageOptions) -> SqliteSessionStorage {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    SqliteSessionStorage::with_pool(pool, options).await.unwrap()
}

async fn backends() -> Backends {
    let dir = tempfile::tempdir().unwrap();
    let kv = KvSessionStorage::open(dir.path().join("sessions.redb"))
        .await
        .unwrap();
    let sqlite = sqlite_storage(SqlStorageOptions::default()).await;

    Backends {
        storages: vec![
            ("memory", Box::new(MemorySessionStorage::new())),
            ("kv", Box::new(kv)),
            ("sqlite", Box::new(sqlite)),
        ],
        _dir: dir,
    }
}

fn millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

fn offline(shop: &str) -> Session {
    let shop = ShopDomain::new(shop).unwrap();
    Session::new(
        Session::generate_offline_id(&shop),
        shop,
        "offline-token".to_string(),
        "read_products,write_orders".parse().unwrap(),
        false,
        None,
    )
}

fn online(shop: &str, user_id: u64) -> Session {
    let shop = ShopDomain::new(shop).unwrap();
    Session::new(
        Session::generate_online_id(&shop, user_id),
        shop,
        "online-token".to_string(),
        "read_products".parse().unwrap(),
        true,
        millis(1_900_000_000_123),
    )
    .with_state("nonce-123")
    .with_online_access_info(OnlineAccessInfo::new(
        AssociatedUser::new(
            user_id,
            "Ada".to_string(),
            "Lovelace".to_string(),
            "ada@example.com".to_string(),
            true,
            false,
            "en-GB".to_string(),
            true,
        ),
        "read_products".parse().unwrap(),
        86_399,
    ))
}

#[tokio::test]
async fn test_store_then_load_returns_equal_session() {
    let backends = backends().await;
    let sessions = [
        offline("shop-a"),
        online("shop-a", 1),
        offline("shop-b").with_refresh_token("refresh-1", millis(1_950_000_000_000)),
    ];

    for (name, storage) in &backends.storages {
        for session in &sessions {
            assert!(storage.store_session(session).await.unwrap(), "{name}");
            let loaded = storage.load_session(&session.id).await.unwrap();
            assert_eq!(loaded.as_ref(), Some(session), "{name}");
        }
    }
}

#[tokio::test]
async fn test_loaded_online_session_keeps_user_and_timestamps() {
    let backends = backends().await;
    let session = online("shop-a", 77);

    for (name, storage) in &backends.storages {
        storage.store_session(&session).await.unwrap();
        let loaded = storage.load_session(&session.id).await.unwrap().unwrap();

        assert_eq!(loaded.state.as_deref(), Some("nonce-123"), "{name}");
        assert_eq!(loaded.expires, millis(1_900_000_000_123), "{name}");
        let info = loaded.online_access_info.unwrap();
        assert_eq!(info.expires_in, 86_399, "{name}");
        assert_eq!(info.associated_user.email, "ada@example.com", "{name}");
        assert!(info.associated_user.collaborator, "{name}");
    }
}

#[tokio::test]
async fn test_load_missing_session_returns_none() {
    let backends = backends().await;

    for (name, storage) in &backends.storages {
        assert!(storage.load_session("missing").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_store_replaces_session_with_same_id() {
    let backends = backends().await;
    let first = offline("shop-a");
    let mut second = offline("shop-a");
    second.access_token = "rotated-token".to_string();
    second.scopes = "read_products".parse().unwrap();

    for (name, storage) in &backends.storages {
        storage.store_session(&first).await.unwrap();
        storage.store_session(&second).await.unwrap();

        let loaded = storage.load_session(&first.id).await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "rotated-token", "{name}");
        assert_eq!(loaded, second, "{name}");

        let shop = ShopDomain::new("shop-a").unwrap();
        assert_eq!(storage.find_sessions_by_shop(&shop).await.unwrap().len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_delete_session_is_idempotent() {
    let backends = backends().await;
    let session = offline("shop-a");

    for (name, storage) in &backends.storages {
        storage.store_session(&session).await.unwrap();

        assert!(storage.delete_session(&session.id).await.unwrap(), "{name}");
        assert!(storage.load_session(&session.id).await.unwrap().is_none(), "{name}");
        assert!(storage.delete_session(&session.id).await.unwrap(), "{name}");
    }
}

#[tokio::test]
async fn test_delete_sessions_removes_only_listed_ids() {
    let backends = backends().await;
    let keep = offline("shop-a");
    let drop_one = online("shop-a", 1);
    let drop_two = online("shop-a", 2);

    for (name, storage) in &backends.storages {
        for session in [&keep, &drop_one, &drop_two] {
            storage.store_session(session).await.unwrap();
        }

        let ids = vec![drop_one.id.clone(), drop_two.id.clone(), "missing".to_string()];
        assert!(storage.delete_sessions(&ids).await.unwrap(), "{name}");
        assert!(storage.delete_sessions(&[]).await.unwrap(), "{name}");

        assert!(storage.load_session(&keep.id).await.unwrap().is_some(), "{name}");
        assert!(storage.load_session(&drop_one.id).await.unwrap().is_none(), "{name}");
        assert!(storage.load_session(&drop_two.id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_find_sessions_by_shop_returns_online_and_offline() {
    let backends = backends().await;
    let shop_a = [offline("shop-a"), online("shop-a", 1), online("shop-a", 2)];
    let other = offline("shop-b");

    for (name, storage) in &backends.storages {
        for session in shop_a.iter().chain([&other]) {
            storage.store_session(session).await.unwrap();
        }

        let shop = ShopDomain::new("shop-a").unwrap();
        let mut found = storage.find_sessions_by_shop(&shop).await.unwrap();
        found.sort_by(|a, b| a.id.cmp(&b.id));

        let mut expected = shop_a.to_vec();
        expected.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(found, expected, "{name}");

        let unknown = ShopDomain::new("shop-c").unwrap();
        assert!(storage.find_sessions_by_shop(&unknown).await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_sqlite_uses_custom_table_names() {
    let options = SqlStorageOptions::new()
        .session_table_name("app_sessions")
        .unwrap()
        .migration_table_name("app_session_migrations")
        .unwrap();
    let storage = sqlite_storage(options).await;
    storage.store_session(&offline("shop-a")).await.unwrap();

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_sessions")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    let migrations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_session_migrations")
        .fetch_one(storage.pool())
        .await
        .unwrap();

    assert_eq!(stored, 1);
    assert_eq!(migrations, 3);
}

#[tokio::test]
async fn test_sqlite_stores_timestamps_as_milliseconds() {
    let storage = sqlite_storage(SqlStorageOptions::default()).await;
    let session = online("shop-a", 5);
    storage.store_session(&session).await.unwrap();

    let expires: i64 = sqlx::query_scalar("SELECT expires FROM shopify_sessions WHERE id = ?")
        .bind(&session.id)
        .fetch_one(storage.pool())
        .await
        .unwrap();

    assert_eq!(expires, 1_900_000_000_123);
}

#[tokio::test]
async fn test_storage_is_usable_as_shared_trait_object() {
    let storage: std::sync::Arc<dyn SessionStorage> =
        std::sync::Arc::new(MemorySessionStorage::new());

    let handles: Vec<_> = (1..=4)
        .map(|user_id| {
            let storage = std::sync::Arc::clone(&storage);
            tokio::spawn(async move { storage.store_session(&online("shop-a", user_id)).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let shop = ShopDomain::new("shop-a").unwrap();
    assert_eq!(storage.find_sessions_by_shop(&shop).await.unwrap().len(), 4);
}
