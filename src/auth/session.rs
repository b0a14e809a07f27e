//! OAuth sessions and their lifecycle.
//!
//! A [`Session`] holds everything needed to call the Admin API on behalf of a
//! shop. Offline sessions belong to the app and are keyed by shop; online
//! sessions belong to a staff user and expire.

use crate::auth::properties::SessionProperties;
use crate::auth::{AuthScopes, OnlineAccessInfo};
use crate::config::ShopDomain;
use chrono::{DateTime, Duration, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Window before expiry in which [`Session::is_active_with_scopes`] already
/// treats a token as expired.
const ACTIVE_EXPIRY_WINDOW_MILLIS: i64 = 500;

/// Represents an authenticated session for Shopify API calls.
///
/// # Equality
///
/// Two sessions are equal when their full property arrays (user data
/// included) are equal. Timestamps therefore compare at millisecond
/// precision, which is what every storage backend preserves.
///
/// # Serialization
///
/// Serializes as its property array with user data, e.g.
/// `[["id","..."],["shop","..."],["isOnline",false]]`.
///
/// # Example
///
/// ```rust
/// use shopify_app_session::{Session, ShopDomain};
///
/// let shop = ShopDomain::new("my-store").unwrap();
/// let session = Session::new(
///     Session::generate_offline_id(&shop),
///     shop,
///     "access-token".to_string(),
///     "read_products".parse().unwrap(),
///     false, // offline session
///     None,  // no expiration
/// );
///
/// assert_eq!(session.id, "offline_my-store.myshopify.com");
/// assert!(session.is_active());
/// assert!(!session.expired());
/// ```
#[derive(Clone, Debug)]
pub struct Session {
    /// Unique identifier for this session.
    pub id: String,

    /// The shop this session is for.
    pub shop: ShopDomain,

    /// OAuth state parameter, if the session was created by an OAuth flow.
    pub state: Option<String>,

    /// Whether this is an online (user-specific) session.
    pub is_online: bool,

    /// The OAuth scopes granted to this session.
    pub scopes: AuthScopes,

    /// When this session expires, if applicable.
    pub expires: Option<DateTime<Utc>>,

    /// The access token for API authentication. Empty when not yet granted.
    pub access_token: String,

    /// Refresh token for expiring offline tokens.
    pub refresh_token: Option<String>,

    /// When the refresh token expires.
    pub refresh_token_expires: Option<DateTime<Utc>>,

    /// User metadata for online sessions.
    pub online_access_info: Option<OnlineAccessInfo>,
}

impl Session {
    /// Creates a new session with the specified parameters.
    #[must_use]
    pub const fn new(
        id: String,
        shop: ShopDomain,
        access_token: String,
        scopes: AuthScopes,
        is_online: bool,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            shop,
            state: None,
            is_online,
            scopes,
            expires,
            access_token,
            refresh_token: None,
            refresh_token_expires: None,
            online_access_info: None,
        }
    }

    /// Sets the OAuth state.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the refresh token and its expiry.
    #[must_use]
    pub fn with_refresh_token(
        mut self,
        refresh_token: impl Into<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self.refresh_token_expires = expires;
        self
    }

    /// Attaches online access metadata.
    #[must_use]
    pub fn with_online_access_info(mut self, info: OnlineAccessInfo) -> Self {
        self.online_access_info = Some(info);
        self
    }

    /// Returns the id of the offline session for `shop`: `offline_{shop}`.
    #[must_use]
    pub fn generate_offline_id(shop: &ShopDomain) -> String {
        format!("offline_{shop}")
    }

    /// Returns the id of a user's online session for `shop`: `{shop}_{user_id}`.
    ///
    /// Embedded apps derive this id from the session token on every request.
    #[must_use]
    pub fn generate_online_id(shop: &ShopDomain, user_id: u64) -> String {
        format!("{shop}_{user_id}")
    }

    /// Returns `true` if this session has expired.
    ///
    /// Sessions without an expiration time are considered never expired.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.is_expired_within(Duration::zero())
    }

    /// Returns `true` if the session expires within `window` from now.
    #[must_use]
    pub fn is_expired_within(&self, window: Duration) -> bool {
        Self::lapses_within(self.expires, window)
    }

    /// Returns `true` if the refresh token has expired.
    ///
    /// A missing refresh-token expiry never expires.
    #[must_use]
    pub fn refresh_token_expired(&self) -> bool {
        Self::lapses_within(self.refresh_token_expires, Duration::zero())
    }

    fn lapses_within(expires: Option<DateTime<Utc>>, window: Duration) -> bool {
        expires.is_some_and(|expires| expires - window < Utc::now())
    }

    /// Returns `true` if the session's scopes cover `required`.
    #[must_use]
    pub fn is_scope_included(&self, required: &AuthScopes) -> bool {
        self.scopes.covers(required)
    }

    /// Returns `true` if the app now requires scopes this session lacks.
    #[must_use]
    pub fn is_scope_changed(&self, required: &AuthScopes) -> bool {
        !self.is_scope_included(required)
    }

    /// Returns `true` if this session is active (not expired and has access token).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }

    /// Returns `true` if the session can serve a request needing `required`.
    ///
    /// The token must be present, cover the scopes, and stay valid for at
    /// least another 500 ms.
    #[must_use]
    pub fn is_active_with_scopes(&self, required: &AuthScopes) -> bool {
        self.is_scope_included(required)
            && !self.access_token.is_empty()
            && !self.is_expired_within(Duration::milliseconds(ACTIVE_EXPIRY_WINDOW_MILLIS))
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.to_property_array(true) == other.to_property_array(true)
    }
}

impl Eq for Session {}

impl Serialize for Session {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_property_array(true).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let props = SessionProperties::deserialize(deserializer)?;
        Self::from_property_array(&props).map_err(de::Error::custom)
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};
