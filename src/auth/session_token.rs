//! App Bridge session token (JWT) validation.
//!
//! Embedded apps receive a short-lived HS256 JWT from App Bridge on every
//! request, in the `Authorization: Bearer <token>` header. Decoding it tells
//! the app which shop, and for online access which user, the request is for.
//!
//! # Claims
//!
//! - `iss`: Issuer (e.g., `https://shop.myshopify.com/admin`)
//! - `dest`: Destination shop (e.g., `https://shop.myshopify.com`)
//! - `aud`: Audience, must equal the app's API key
//! - `sub`: Subject, the staff user id for admin tokens
//! - `exp` / `nbf` / `iat`: Validity window, checked with a 10 second leeway
//! - `jti`: Token id
//! - `sid`: Shopify session id
//!
//! Tokens are verified with the primary secret key first and with the old
//! secret key as a fallback during key rotation.

use crate::auth::error::AuthError;
use crate::config::{ShopDomain, ShopifyConfig};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Leeway for time-based claims, in seconds.
const JWT_LEEWAY_SECS: u64 = 10;

/// Decoded claims of a Shopify session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtPayload {
    /// Issuer - the Shopify admin URL that issued the token.
    pub iss: String,

    /// Destination - the target shop URL.
    pub dest: String,

    /// Audience - the app's API key.
    pub aud: String,

    /// Subject - the user ID for online tokens.
    pub sub: Option<String>,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,

    /// Not before timestamp (Unix seconds).
    pub nbf: i64,

    /// Issued at timestamp (Unix seconds).
    pub iat: i64,

    /// JWT ID.
    pub jti: String,

    /// Shopify session ID.
    pub sid: Option<String>,
}

impl JwtPayload {
    /// Decodes and validates a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidJwt`] if the signature matches neither
    /// secret key, a time claim is out of range, or `aud` is not the API key.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use shopify_app_session::auth::JwtPayload;
    ///
    /// let payload = JwtPayload::decode(session_token, &config)?;
    /// println!("Shop: {}", payload.shop());
    /// ```
    pub fn decode(token: &str, config: &ShopifyConfig) -> Result<Self, AuthError> {
        let mut first_error = None;
        let mut payload = None;

        for key in config.secret_keys() {
            match Self::decode_with_key(token, key.as_ref()) {
                Ok(decoded) => {
                    payload = Some(decoded);
                    break;
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        let Some(payload) = payload else {
            let reason = first_error.map_or_else(String::new, |e| e.to_string());
            tracing::warn!(error = %reason, "Rejected session token");
            return Err(AuthError::InvalidJwt {
                reason: format!("Error decoding session token: {reason}"),
            });
        };

        if payload.aud != config.api_key().as_ref() {
            tracing::warn!(aud = %payload.aud, "Session token audience does not match API key");
            return Err(AuthError::InvalidJwt {
                reason: "Session token had invalid API key".to_string(),
            });
        }

        Ok(payload)
    }

    fn decode_with_key(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = JWT_LEEWAY_SECS;
        validation.validate_nbf = true;
        // aud is compared against the API key after decoding
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(secret.as_bytes());
        let token_data = decode::<Self>(token, &key, &validation)?;

        Ok(token_data.claims)
    }

    /// Returns the shop domain from the `dest` claim, without `https://`.
    #[must_use]
    pub fn shop(&self) -> &str {
        self.dest
            .strip_prefix("https://")
            .unwrap_or(self.dest.as_str())
    }

    /// Returns the `dest` claim as a validated shop domain.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidJwt`] if `dest` is not a shop domain.
    pub fn shop_domain(&self) -> Result<ShopDomain, AuthError> {
        ShopDomain::new(self.shop()).map_err(|e| AuthError::InvalidJwt {
            reason: e.to_string(),
        })
    }

    /// Returns the Shopify user ID if this is an admin online session token.
    ///
    /// Only numeric `sub` claims on tokens whose `iss` ends with `/admin`
    /// identify a staff user.
    #[must_use]
    pub fn shopify_user_id(&self) -> Option<u64> {
        if !self.iss.ends_with("/admin") {
            return None;
        }

        self.sub
            .as_deref()
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_digit()))
            .and_then(|sub| sub.parse().ok())
    }
}

// Verify JwtPayload is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JwtPayload>();
};
