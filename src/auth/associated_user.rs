//! Per-user metadata carried by online sessions.
//!
//! When an app requests online access, Shopify returns the user who
//! authorized it together with the user's scope and the lifetime of the
//! token. That data is kept in [`OnlineAccessInfo`] on the session.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::{AssociatedUser, OnlineAccessInfo};
//!
//! let user = AssociatedUser::new(
//!     12345,
//!     "Jane".to_string(),
//!     "Doe".to_string(),
//!     "jane@example.com".to_string(),
//!     true,   // email_verified
//!     true,   // account_owner
//!     "en".to_string(),
//!     false,  // collaborator
//! );
//!
//! let info = OnlineAccessInfo::new(user, "read_products".parse().unwrap(), 86_399);
//! assert_eq!(info.associated_user.id, 12345);
//! ```

use crate::auth::AuthScopes;
use serde::{Deserialize, Serialize};

/// A Shopify staff user associated with an online session.
///
/// Only `id` is guaranteed to be known: sessions loaded from storage written
/// without user data carry the id alone and empty/`false` for the rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedUser {
    /// The Shopify user ID (numeric).
    pub id: u64,

    /// The user's first name.
    pub first_name: String,

    /// The user's last name.
    pub last_name: String,

    /// The user's email address.
    pub email: String,

    /// Whether the user's email has been verified.
    pub email_verified: bool,

    /// Whether the user is the account owner.
    pub account_owner: bool,

    /// The user's locale preference (e.g., "en", "fr").
    pub locale: String,

    /// Whether the user is a collaborator.
    pub collaborator: bool,
}

impl AssociatedUser {
    /// Creates a new `AssociatedUser` with all fields.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        id: u64,
        first_name: String,
        last_name: String,
        email: String,
        email_verified: bool,
        account_owner: bool,
        locale: String,
        collaborator: bool,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            email,
            email_verified,
            account_owner,
            locale,
            collaborator,
        }
    }

    /// Creates a user known only by id.
    #[must_use]
    pub const fn with_id(id: u64) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            email_verified: false,
            account_owner: false,
            locale: String::new(),
            collaborator: false,
        }
    }
}

/// Online access metadata attached to user-specific sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineAccessInfo {
    /// Seconds until the online access token expires, as reported by Shopify.
    pub expires_in: i64,

    /// The scopes granted to the user, which may be narrower than the app's.
    pub associated_user_scope: AuthScopes,

    /// The user who authorized the app.
    pub associated_user: AssociatedUser,
}

impl OnlineAccessInfo {
    /// Creates online access info for `user`.
    #[must_use]
    pub const fn new(user: AssociatedUser, associated_user_scope: AuthScopes, expires_in: i64) -> Self {
        Self {
            expires_in,
            associated_user_scope,
            associated_user: user,
        }
    }
}

// Verify the types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AssociatedUser>();
    assert_send_sync::<OnlineAccessInfo>();
};
