//! App configuration.
//!
//! [`ShopifyConfig`] holds what session resolution needs to know about the
//! app: the API key that session tokens are issued for, the secret that
//! signs them (plus the previous secret while it is being rotated out), the
//! scopes a session must cover to count as active, and whether the app runs
//! embedded in the admin.
//!
//! ```rust
//! use shopify_app_session::{ApiKey, ApiSecretKey, ShopifyConfig};
//!
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("my-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("my-secret").unwrap())
//!     .is_embedded(false)
//!     .build()
//!     .unwrap();
//!
//! // Non-embedded apps identify sessions by signed cookie
//! assert!(!config.is_embedded());
//! ```

mod newtypes;

pub use newtypes::{ApiKey, ApiSecretKey, ShopDomain};

use crate::auth::AuthScopes;
use crate::error::ConfigError;

/// Credentials and flags for resolving and validating sessions.
///
/// Cheap to clone and `Send + Sync`; share one per app.
///
/// When `old_api_secret_key` is set, session tokens and session cookies
/// signed with either key are accepted, the current key first. New cookies
/// are always signed with the current key.
#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    api_key: ApiKey,
    api_secret_key: ApiSecretKey,
    old_api_secret_key: Option<ApiSecretKey>,
    scopes: AuthScopes,
    is_embedded: bool,
}

impl ShopifyConfig {
    /// Creates a new builder for constructing a `ShopifyConfig`.
    #[must_use]
    pub fn builder() -> ShopifyConfigBuilder {
        ShopifyConfigBuilder::new()
    }

    /// Returns the API key.
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the API secret key.
    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.api_secret_key
    }

    /// Returns the old API secret key, if configured.
    #[must_use]
    pub const fn old_api_secret_key(&self) -> Option<&ApiSecretKey> {
        self.old_api_secret_key.as_ref()
    }

    /// Returns the scopes a session must cover to be active.
    #[must_use]
    pub const fn scopes(&self) -> &AuthScopes {
        &self.scopes
    }

    /// Returns whether the app is embedded in the Shopify admin.
    ///
    /// Embedded apps identify sessions through App Bridge session tokens,
    /// non-embedded apps through a signed session cookie.
    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        self.is_embedded
    }

    /// Secret keys to verify signatures with, current key first.
    pub(crate) fn secret_keys(&self) -> impl Iterator<Item = &ApiSecretKey> {
        std::iter::once(&self.api_secret_key).chain(self.old_api_secret_key.as_ref())
    }
}

// ShopifyConfig is shared across request handlers
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopifyConfig>();
};

/// Builder for [`ShopifyConfig`].
///
/// `api_key` and `api_secret_key` are required. Apps default to embedded,
/// with no required scopes and no old secret.
#[derive(Debug, Default)]
pub struct ShopifyConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    old_api_secret_key: Option<ApiSecretKey>,
    scopes: Option<AuthScopes>,
    is_embedded: Option<bool>,
}

impl ShopifyConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API secret key (required).
    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Sets the secret being rotated out.
    ///
    /// Sessions whose token or cookie was signed with it keep resolving
    /// until it is removed from the config.
    #[must_use]
    pub fn old_api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.old_api_secret_key = Some(key);
        self
    }

    /// Sets the scopes a session must cover to be active.
    #[must_use]
    pub fn scopes(mut self, scopes: AuthScopes) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Sets whether sessions come from session tokens (`true`) or cookies.
    #[must_use]
    pub const fn is_embedded(mut self, embedded: bool) -> Self {
        self.is_embedded = Some(embedded);
        self
    }

    /// Builds the config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key` or
    /// `api_secret_key` are not set.
    pub fn build(self) -> Result<ShopifyConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;

        Ok(ShopifyConfig {
            api_key,
            api_secret_key,
            old_api_secret_key: self.old_api_secret_key,
            scopes: self.scopes.unwrap_or_default(),
            is_embedded: self.is_embedded.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ShopifyConfigBuilder {
        ShopifyConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("current").unwrap())
    }

    #[test]
    fn test_missing_credentials_name_the_field() {
        let no_key = ShopifyConfigBuilder::new()
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build();
        let no_secret = ShopifyConfigBuilder::new()
            .api_key(ApiKey::new("key").unwrap())
            .build();

        assert!(matches!(
            no_key,
            Err(ConfigError::MissingRequiredField { field: "api_key" })
        ));
        assert!(matches!(
            no_secret,
            Err(ConfigError::MissingRequiredField {
                field: "api_secret_key"
            })
        ));
    }

    #[test]
    fn test_apps_are_embedded_unless_configured_otherwise() {
        assert!(builder().build().unwrap().is_embedded());
        assert!(!builder().is_embedded(false).build().unwrap().is_embedded());
    }

    #[test]
    fn test_no_scopes_are_required_by_default() {
        let config = builder().build().unwrap();
        assert!(config.scopes().is_empty());

        let config = builder()
            .scopes("write_orders".parse().unwrap())
            .build()
            .unwrap();
        assert!(config.scopes().iter().any(|s| s == "write_orders"));
    }

    #[test]
    fn test_rotation_tries_current_secret_before_old() {
        let config = builder()
            .old_api_secret_key(ApiSecretKey::new("previous").unwrap())
            .build()
            .unwrap();

        let keys: Vec<&str> = config.secret_keys().map(AsRef::as_ref).collect();
        assert_eq!(keys, ["current", "previous"]);
    }

    #[test]
    fn test_without_rotation_only_current_secret_is_tried() {
        let config = builder().build().unwrap();

        let keys: Vec<&str> = config.secret_keys().map(AsRef::as_ref).collect();
        assert_eq!(keys, ["current"]);
    }

    #[test]
    fn test_config_can_be_logged_without_leaking_secrets() {
        let config = builder()
            .old_api_secret_key(ApiSecretKey::new("previous").unwrap())
            .build()
            .unwrap();

        let output = format!("{config:?}");
        assert!(!output.contains("current"));
        assert!(!output.contains("previous"));
    }
}
