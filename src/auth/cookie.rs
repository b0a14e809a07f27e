//! Signed session cookie for non-embedded apps.
//!
//! Non-embedded apps remember which session a browser belongs to through the
//! `shopify_app_session` cookie. Its value is the session id; a companion
//! `shopify_app_session.sig` cookie holds the base64 HMAC-SHA256 of that value
//! under the API secret key. A cookie whose signature does not verify is
//! ignored.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::{ShopifyConfig, ApiKey, ApiSecretKey};
//! use shopify_app_session::auth::{read_session_cookie, SessionCookie};
//!
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("secret").unwrap())
//!     .is_embedded(false)
//!     .build()
//!     .unwrap();
//!
//! let cookie = SessionCookie::new(&config, "session-id", None);
//! let header = cookie.to_cookie_header();
//! assert_eq!(read_session_cookie(&config, &header).as_deref(), Some("session-id"));
//! ```

use crate::config::ShopifyConfig;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie holding the session id.
pub const SESSION_COOKIE_NAME: &str = "shopify_app_session";

/// Name of the cookie holding the signature of [`SESSION_COOKIE_NAME`].
pub const SESSION_COOKIE_SIG_NAME: &str = "shopify_app_session.sig";

/// Computes the base64 HMAC-SHA256 signature of a cookie value.
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn sign_cookie_value(value: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(value.as_bytes());
    BASE64_STANDARD.encode(mac.finalize().into_bytes())
}

/// A session cookie together with its signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
    /// The session id carried by the cookie.
    pub value: String,
    /// Base64 HMAC-SHA256 of `value` under the primary secret key.
    pub signature: String,
    /// Cookie expiry; `None` makes it a browser-session cookie.
    pub expires: Option<DateTime<Utc>>,
}

impl SessionCookie {
    /// Signs `session_id` with the config's primary secret key.
    #[must_use]
    pub fn new(
        config: &ShopifyConfig,
        session_id: impl Into<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        let value = session_id.into();
        let signature = sign_cookie_value(&value, config.api_secret_key().as_ref());
        Self {
            value,
            signature,
            expires,
        }
    }

    /// Returns the two `Set-Cookie` header values to send to the browser.
    #[must_use]
    pub fn to_set_cookie_headers(&self) -> [String; 2] {
        let attributes = self.expires.map_or_else(
            || "; Path=/; HttpOnly; Secure; SameSite=Lax".to_string(),
            |expires| {
                format!(
                    "; Path=/; Expires={}; HttpOnly; Secure; SameSite=Lax",
                    expires.format("%a, %d %b %Y %H:%M:%S GMT")
                )
            },
        );

        [
            format!(
                "{SESSION_COOKIE_NAME}={}{attributes}",
                urlencoding::encode(&self.value)
            ),
            format!(
                "{SESSION_COOKIE_SIG_NAME}={}{attributes}",
                urlencoding::encode(&self.signature)
            ),
        ]
    }

    /// Returns the `Cookie` request header a browser would send back.
    #[must_use]
    pub fn to_cookie_header(&self) -> String {
        format!(
            "{SESSION_COOKIE_NAME}={}; {SESSION_COOKIE_SIG_NAME}={}",
            urlencoding::encode(&self.value),
            urlencoding::encode(&self.signature)
        )
    }
}

/// Returns the value of cookie `name` from a `Cookie` request header.
fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key.trim() != name {
            return None;
        }
        urlencoding::decode(value.trim())
            .ok()
            .map(std::borrow::Cow::into_owned)
    })
}

/// Reads the verified session id from a `Cookie` request header.
///
/// Returns `None` when either cookie is missing or the signature matches
/// neither the primary nor the old secret key.
#[must_use]
pub fn read_session_cookie(config: &ShopifyConfig, cookie_header: &str) -> Option<String> {
    let value = cookie_value(cookie_header, SESSION_COOKIE_NAME)?;
    let Some(signature) = cookie_value(cookie_header, SESSION_COOKIE_SIG_NAME) else {
        tracing::warn!("Session cookie present without signature");
        return None;
    };

    let verified = config.secret_keys().any(|key| {
        let expected = sign_cookie_value(&value, key.as_ref());
        bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
    });

    if verified {
        Some(value)
    } else {
        tracing::warn!("Session cookie signature mismatch");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};
    use chrono::TimeZone;

    fn config(primary: &str, old: Option<&str>) -> ShopifyConfig {
        let mut builder = ShopifyConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new(primary).unwrap())
            .is_embedded(false);
        if let Some(old) = old {
            builder = builder.old_api_secret_key(ApiSecretKey::new(old).unwrap());
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_signature_is_base64_sha256() {
        let sig = sign_cookie_value("session-id", "secret");
        assert_eq!(sig.len(), 44);
        assert_eq!(sig, sign_cookie_value("session-id", "secret"));
        assert_ne!(sig, sign_cookie_value("session-id", "other"));
    }

    #[test]
    fn test_read_session_cookie_among_other_cookies() {
        let config = config("secret", None);
        let cookie = SessionCookie::new(&config, "abc-123", None);
        let header = format!("theme=dark; {}; lang=en", cookie.to_cookie_header());

        assert_eq!(
            read_session_cookie(&config, &header),
            Some("abc-123".to_string())
        );
    }

    #[test]
    fn test_read_session_cookie_rejects_tampered_value() {
        let config = config("secret", None);
        let cookie = SessionCookie::new(&config, "abc-123", None);
        let header = format!(
            "{SESSION_COOKIE_NAME}=someone-else; {SESSION_COOKIE_SIG_NAME}={}",
            urlencoding::encode(&cookie.signature)
        );

        assert_eq!(read_session_cookie(&config, &header), None);
    }

    #[test]
    fn test_read_session_cookie_requires_signature() {
        let config = config("secret", None);
        let header = format!("{SESSION_COOKIE_NAME}=abc-123");
        assert_eq!(read_session_cookie(&config, &header), None);
        assert_eq!(read_session_cookie(&config, ""), None);
    }

    #[test]
    fn test_read_session_cookie_accepts_old_key() {
        let old_config = config("old-secret", None);
        let cookie = SessionCookie::new(&old_config, "abc-123", None);

        let rotated = config("new-secret", Some("old-secret"));
        assert_eq!(
            read_session_cookie(&rotated, &cookie.to_cookie_header()),
            Some("abc-123".to_string())
        );

        let without_old = config("new-secret", None);
        assert_eq!(
            read_session_cookie(&without_old, &cookie.to_cookie_header()),
            None
        );
    }

    #[test]
    fn test_set_cookie_headers_include_expiry() {
        let config = config("secret", None);
        let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let [value, sig] = SessionCookie::new(&config, "abc", Some(expires)).to_set_cookie_headers();

        assert!(value.starts_with("shopify_app_session=abc; Path=/;"));
        assert!(value.contains("Expires=Wed, 02 Jan 2030 03:04:05 GMT"));
        assert!(sig.starts_with("shopify_app_session.sig="));
        assert!(sig.contains("HttpOnly"));
    }
}
