//! # Shopify App Session
//!
//! Session handling for Shopify apps: the [`Session`] model, session-id
//! resolution for incoming requests, and pluggable session persistence.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ShopifyConfig`] and [`ShopifyConfigBuilder`]
//! - Validated newtypes for API credentials and shop domains
//! - OAuth scope handling with implied scope support
//! - The [`Session`] model with expiry and scope checks, and its flat
//!   property-array form used by storage backends
//! - Session-id resolution from App Bridge session tokens or signed cookies
//!   via [`auth::current_session_id`]
//! - The [`SessionStorage`] trait with in-memory, embedded key-value,
//!   SQLite, PostgreSQL and MySQL backends
//!
//! ## Quick Start
//!
//! ```rust
//! use shopify_app_session::{ShopifyConfig, ApiKey, ApiSecretKey};
//!
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("your-api-secret").unwrap())
//!     .scopes("read_products,write_orders".parse().unwrap())
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Sessions
//!
//! Sessions are either offline (app-level, one per shop) or online (one per
//! shop and user):
//!
//! ```rust
//! use shopify_app_session::{Session, ShopDomain};
//!
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
//! assert_eq!(session.id, "offline_my-store.myshopify.com");
//! assert!(session.is_active_with_scopes(&"read_products".parse().unwrap()));
//! ```
//!
//! ## Loading the Current Session
//!
//! ```rust,ignore
//! use shopify_app_session::auth::RequestHeaders;
//! use shopify_app_session::session_storage::{load_current_session, SqliteSessionStorage};
//!
//! let storage = SqliteSessionStorage::connect("sqlite://sessions.db").await?;
//! let headers = RequestHeaders::new().authorization(request_authorization_header);
//!
//! if let Some(session) = load_current_session(&config, &storage, &headers, true).await? {
//!     if session.is_active_with_scopes(config.scopes()) {
//!         // use session.access_token
//!     }
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Storage is async and designed for the Tokio runtime
//! - **Last write wins**: Storage backends upsert by session id without
//!   extra locking

pub mod auth;
pub mod config;
pub mod error;
pub mod session_storage;

// Re-export public types at crate root for convenience
pub use auth::{AssociatedUser, AuthError, AuthScopes, OnlineAccessInfo, Session, SessionError};
pub use config::{ApiKey, ApiSecretKey, ShopDomain, ShopifyConfig, ShopifyConfigBuilder};
pub use error::ConfigError;

// Re-export storage types
pub use session_storage::{load_current_session, SessionStorage, SessionStorageError};
