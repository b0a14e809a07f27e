//! Resolving the session id of an incoming request.
//!
//! Embedded apps find it in the App Bridge session token, non-embedded apps
//! in the signed session cookie. The request is described by
//! [`RequestHeaders`] so any HTTP framework can feed it.

use crate::auth::cookie::read_session_cookie;
use crate::auth::error::AuthError;
use crate::auth::session_token::JwtPayload;
use crate::auth::Session;
use crate::config::ShopifyConfig;
use uuid::Uuid;

/// The request headers session lookup depends on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    /// Value of the `Authorization` header.
    pub authorization: Option<String>,
    /// Value of the `Cookie` header.
    pub cookie: Option<String>,
}

impl RequestHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `Authorization` header.
    #[must_use]
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Sets the `Authorization` header to `Bearer <token>`.
    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.authorization(format!("Bearer {token}"))
    }

    /// Sets the `Cookie` header.
    #[must_use]
    pub fn cookie(mut self, value: impl Into<String>) -> Self {
        self.cookie = Some(value.into());
        self
    }

    fn bearer_token(&self) -> Option<Result<&str, AuthError>> {
        let header = self.authorization.as_deref()?;
        Some(
            header
                .strip_prefix("Bearer ")
                .filter(|token| !token.is_empty())
                .ok_or(AuthError::MissingBearerToken),
        )
    }
}

/// Returns the id of the session the request belongs to, if any.
///
/// - Embedded apps: without an `Authorization` header there is no session.
///   Otherwise the bearer token is decoded and the id is the user's online
///   id (`is_online`) or the shop's offline id.
/// - Non-embedded apps: the verified value of the session cookie.
///
/// # Errors
///
/// - [`AuthError::MissingBearerToken`] if `Authorization` is not a bearer token
/// - [`AuthError::InvalidJwt`] if the token fails validation, or an online id
///   is requested from a token without a user
pub fn current_session_id(
    config: &ShopifyConfig,
    headers: &RequestHeaders,
    is_online: bool,
) -> Result<Option<String>, AuthError> {
    if !config.is_embedded() {
        return Ok(headers
            .cookie
            .as_deref()
            .and_then(|cookie| read_session_cookie(config, cookie)));
    }

    let Some(token) = headers.bearer_token() else {
        return Ok(None);
    };

    let payload = JwtPayload::decode(token?, config)?;
    let shop = payload.shop_domain()?;

    if is_online {
        let user_id = payload.shopify_user_id().ok_or_else(|| AuthError::InvalidJwt {
            reason: "Session token does not identify a user".to_string(),
        })?;
        Ok(Some(Session::generate_online_id(&shop, user_id)))
    } else {
        Ok(Some(Session::generate_offline_id(&shop)))
    }
}

/// Generates a random id for an online session of a non-embedded app.
///
/// The result is a version 4 UUID string, which is also what ends up in the
/// session cookie.
#[must_use]
pub fn new_cookie_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookie::SessionCookie;
    use crate::config::{ApiKey, ApiSecretKey};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn config(embedded: bool) -> ShopifyConfig {
        ShopifyConfig::builder()
            .api_key(ApiKey::new("api-key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .is_embedded(embedded)
            .build()
            .unwrap()
    }

    fn token(sub: Option<&str>) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = json!({
            "iss": "https://my-store.myshopify.com/admin",
            "dest": "https://my-store.myshopify.com",
            "aud": "api-key",
            "sub": sub,
            "exp": now + 60,
            "nbf": now - 5,
            "iat": now,
            "jti": "jti",
            "sid": "sid",
        });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_embedded_offline_id_from_token() {
        let headers = RequestHeaders::new().bearer(&token(Some("7")));
        let id = current_session_id(&config(true), &headers, false).unwrap();
        assert_eq!(id.as_deref(), Some("offline_my-store.myshopify.com"));
    }

    #[test]
    fn test_embedded_online_id_from_token() {
        let headers = RequestHeaders::new().bearer(&token(Some("7")));
        let id = current_session_id(&config(true), &headers, true).unwrap();
        assert_eq!(id.as_deref(), Some("my-store.myshopify.com_7"));
    }

    #[test]
    fn test_embedded_online_id_requires_user() {
        let headers = RequestHeaders::new().bearer(&token(None));
        let result = current_session_id(&config(true), &headers, true);
        assert!(matches!(result, Err(AuthError::InvalidJwt { .. })));
    }

    #[test]
    fn test_embedded_without_authorization_has_no_session() {
        let headers = RequestHeaders::new().cookie("unrelated=1");
        assert_eq!(current_session_id(&config(true), &headers, false), Ok(None));
    }

    #[test]
    fn test_embedded_non_bearer_authorization_is_an_error() {
        let headers = RequestHeaders::new().authorization("Basic dXNlcjpwYXNz");
        assert_eq!(
            current_session_id(&config(true), &headers, false),
            Err(AuthError::MissingBearerToken)
        );

        let headers = RequestHeaders::new().authorization("Bearer ");
        assert_eq!(
            current_session_id(&config(true), &headers, false),
            Err(AuthError::MissingBearerToken)
        );
    }

    #[test]
    fn test_non_embedded_reads_signed_cookie() {
        let config = config(false);
        let cookie = SessionCookie::new(&config, "cookie-session", None);
        let headers = RequestHeaders::new()
            .bearer("ignored")
            .cookie(cookie.to_cookie_header());

        assert_eq!(
            current_session_id(&config, &headers, true),
            Ok(Some("cookie-session".to_string()))
        );
        assert_eq!(
            current_session_id(&config, &RequestHeaders::new(), true),
            Ok(None)
        );
    }

    #[test]
    fn test_new_cookie_session_id_is_uuid_v4() {
        let id = new_cookie_session_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(parsed.hyphenated().to_string(), id);
        assert_ne!(id, new_cookie_session_id());
    }
}
