//! Credentials and shop identity.
//!
//! The API key is the audience every session token must carry, and the
//! secret keys sign both session tokens and session cookies. [`ShopDomain`]
//! is the shop half of every session id and the key sessions are grouped by
//! in storage.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The app's API key, compared against the `aud` claim of session tokens.
///
/// ```rust
/// use shopify_app_session::ApiKey;
///
/// let key = ApiKey::new("my-api-key").unwrap();
/// assert_eq!(key.as_ref(), "my-api-key");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKey`] if `key` is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An HMAC key for session tokens and session cookies.
///
/// `Debug` never prints the key, so a config can be logged as a whole.
///
/// ```rust
/// use shopify_app_session::ApiSecretKey;
///
/// let secret = ApiSecretKey::new("my-secret").unwrap();
/// assert_eq!(format!("{secret:?}"), "ApiSecretKey(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecretKey(String);

impl ApiSecretKey {
    /// Wraps `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiSecretKey`] if `key` is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiSecretKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiSecretKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecretKey(*****)")
    }
}

/// A shop's `*.myshopify.com` domain, lowercased.
///
/// The bare handle (`my-store`) is expanded to the full domain, so sessions
/// created from a session token's `dest`, from a stored `shop` property or
/// from application code all compare equal and land under the same shop in
/// storage. Anything outside `myshopify.com` is rejected.
///
/// ```rust
/// use shopify_app_session::ShopDomain;
///
/// let from_handle = ShopDomain::new("My-Store").unwrap();
/// let from_token = ShopDomain::new("my-store.myshopify.com").unwrap();
/// assert_eq!(from_handle, from_token);
/// assert_eq!(from_handle.to_string(), "my-store.myshopify.com");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShopDomain(String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// Validates and normalizes `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopDomain`] if the handle is empty,
    /// has characters other than `a-z`, `0-9` and `-`, starts or ends with
    /// `-`, or the domain is not under `myshopify.com`.
    pub fn new(domain: impl Into<String>) -> Result<Self, ConfigError> {
        let domain = domain.into().trim().to_lowercase();

        if !domain.ends_with(Self::SUFFIX) && domain.contains('.') {
            return Err(ConfigError::InvalidShopDomain { domain });
        }
        let handle = domain.strip_suffix(Self::SUFFIX).unwrap_or(&domain);

        let valid = !handle.is_empty()
            && !handle.starts_with('-')
            && !handle.ends_with('-')
            && handle
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid {
            return Err(ConfigError::InvalidShopDomain { domain });
        }

        Ok(Self(format!("{handle}{}", Self::SUFFIX)))
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ShopDomain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ShopDomain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}
