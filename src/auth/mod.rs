//! Sessions, session tokens and session ids.
//!
//! # Overview
//!
//! - [`AuthScopes`]: A set of OAuth scopes with implied scope handling
//! - [`Session`]: An authenticated session and its lifecycle checks
//! - [`AssociatedUser`] / [`OnlineAccessInfo`]: User data of online sessions
//! - [`JwtPayload`]: App Bridge session token validation
//! - [`SessionCookie`]: Signed session cookie of non-embedded apps
//! - [`current_session_id`]: Maps request headers to a session id
//!
//! # Session Types
//!
//! - **Offline sessions**: App-level tokens keyed by shop
//!   (`offline_{shop}`). Used for background work and webhooks.
//! - **Online sessions**: User-specific tokens that expire, keyed by
//!   `{shop}_{user_id}` for embedded apps or a random id for cookie-based apps.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::{Session, ShopDomain};
//!
//! let shop = ShopDomain::new("my-store").unwrap();
//! let offline_session = Session::new(
//!     Session::generate_offline_id(&shop),
//!     shop,
//!     "access-token".to_string(),
//!     "read_products".parse().unwrap(),
//!     false,
//!     None,
//! );
//!
//! // Offline sessions don't expire
//! assert!(!offline_session.expired());
//! ```

mod associated_user;
pub mod cookie;
mod error;
pub mod properties;
mod scopes;
pub mod session;
pub mod session_id;
pub mod session_token;

pub use associated_user::{AssociatedUser, OnlineAccessInfo};
pub use cookie::{read_session_cookie, SessionCookie};
pub use error::{AuthError, SessionError};
pub use properties::{PropertyValue, SessionProperties};
pub use scopes::AuthScopes;
pub use session::Session;
pub use session_id::{current_session_id, new_cookie_session_id, RequestHeaders};
pub use session_token::JwtPayload;
