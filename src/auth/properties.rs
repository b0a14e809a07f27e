//! Flat property-array representation of a [`Session`].
//!
//! Storage backends that do not map sessions onto columns persist them as an
//! ordered list of `[key, value]` pairs, serialized as JSON:
//!
//! ```json
//! [["id","offline_my-store.myshopify.com"],["shop","my-store.myshopify.com"],
//!  ["isOnline",false],["scope","read_products"],["accessToken","shpat_..."]]
//! ```
//!
//! Timestamps are epoch milliseconds. Absent values are omitted. Decoding is
//! lenient about key case and value shapes so rows written by older writers
//! (booleans as `0`/`1` or `"true"`, numbers as strings) still load.

use crate::auth::error::SessionError;
use crate::auth::{AssociatedUser, AuthScopes, OnlineAccessInfo, Session};
use crate::config::ShopDomain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single persisted property value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A boolean flag such as `isOnline`.
    Bool(bool),
    /// An integer such as a timestamp in milliseconds or a user id.
    Number(i64),
    /// Any textual value.
    Text(String),
}

/// An ordered `[key, value]` list describing one session.
pub type SessionProperties = Vec<(String, PropertyValue)>;

impl PropertyValue {
    fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    fn to_bool(&self, key: &str) -> Result<bool, SessionError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Number(n) => Ok(*n != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                other => Err(invalid(key, format!("expected a boolean, got '{other}'"))),
            },
        }
    }

    fn to_i64(&self, key: &str) -> Result<i64, SessionError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| invalid(key, format!("expected a number, got '{s}'"))),
            Self::Bool(_) => Err(invalid(key, "expected a number, got a boolean")),
        }
    }

    fn to_u64(&self, key: &str) -> Result<u64, SessionError> {
        if let Self::Text(s) = self {
            return s
                .trim()
                .parse()
                .map_err(|_| invalid(key, format!("expected a positive number, got '{s}'")));
        }
        let n = self.to_i64(key)?;
        u64::try_from(n).map_err(|_| invalid(key, format!("expected a positive number, got {n}")))
    }

    fn to_datetime(&self, key: &str) -> Result<DateTime<Utc>, SessionError> {
        let millis = self.to_i64(key)?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| invalid(key, format!("timestamp {millis} is out of range")))
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> SessionError {
    SessionError::InvalidProperty {
        property: key.to_string(),
        reason: reason.into(),
    }
}

fn push(props: &mut SessionProperties, key: &str, value: PropertyValue) {
    props.push((key.to_string(), value));
}

fn user_id_value(id: u64) -> PropertyValue {
    i64::try_from(id).map_or_else(|_| PropertyValue::Text(id.to_string()), PropertyValue::Number)
}

impl Session {
    /// Flattens the session into its persisted property array.
    ///
    /// Online sessions always carry `userId`. With `include_user_data` the
    /// remaining associated-user fields are appended as well.
    #[must_use]
    pub fn to_property_array(&self, include_user_data: bool) -> SessionProperties {
        let mut props = SessionProperties::new();

        push(&mut props, "id", PropertyValue::Text(self.id.clone()));
        push(&mut props, "shop", PropertyValue::Text(self.shop.to_string()));
        if let Some(state) = &self.state {
            push(&mut props, "state", PropertyValue::Text(state.clone()));
        }
        push(&mut props, "isOnline", PropertyValue::Bool(self.is_online));
        if let Some(scope) = self.scopes.to_stored() {
            push(&mut props, "scope", PropertyValue::Text(scope));
        }
        if let Some(expires) = self.expires {
            push(&mut props, "expires", PropertyValue::Number(expires.timestamp_millis()));
        }
        if !self.access_token.is_empty() {
            push(&mut props, "accessToken", PropertyValue::Text(self.access_token.clone()));
        }
        if let Some(refresh_token) = &self.refresh_token {
            push(&mut props, "refreshToken", PropertyValue::Text(refresh_token.clone()));
        }
        if let Some(expires) = self.refresh_token_expires {
            push(
                &mut props,
                "refreshTokenExpires",
                PropertyValue::Number(expires.timestamp_millis()),
            );
        }

        if let Some(info) = &self.online_access_info {
            let user = &info.associated_user;
            push(&mut props, "userId", user_id_value(user.id));

            if include_user_data {
                push(&mut props, "firstName", PropertyValue::Text(user.first_name.clone()));
                push(&mut props, "lastName", PropertyValue::Text(user.last_name.clone()));
                push(&mut props, "email", PropertyValue::Text(user.email.clone()));
                push(&mut props, "accountOwner", PropertyValue::Bool(user.account_owner));
                push(&mut props, "locale", PropertyValue::Text(user.locale.clone()));
                push(&mut props, "collaborator", PropertyValue::Bool(user.collaborator));
                push(&mut props, "emailVerified", PropertyValue::Bool(user.email_verified));
                if let Some(scope) = info.associated_user_scope.to_stored() {
                    push(&mut props, "associatedUserScope", PropertyValue::Text(scope));
                }
                push(
                    &mut props,
                    "onlineAccessExpiresIn",
                    PropertyValue::Number(info.expires_in),
                );
            }
        }

        props
    }

    /// Rebuilds a session from a persisted property array.
    ///
    /// Keys match case-insensitively and unknown keys are ignored. The legacy
    /// `onlineAccessInfo` key is read as the associated user id.
    ///
    /// # Errors
    ///
    /// - [`SessionError::MissingProperty`] if `id` or `shop` is absent
    /// - [`SessionError::InvalidProperty`] if a value has the wrong shape, or
    ///   the shop domain or a scope string is invalid
    pub fn from_property_array(props: &[(String, PropertyValue)]) -> Result<Self, SessionError> {
        let mut id = None;
        let mut shop = None;
        let mut state = None;
        let mut is_online = false;
        let mut scopes = AuthScopes::new();
        let mut expires = None;
        let mut access_token = String::new();
        let mut refresh_token = None;
        let mut refresh_token_expires = None;

        let mut user_id = None;
        let mut user = AssociatedUser::with_id(0);
        let mut associated_user_scope = AuthScopes::new();
        let mut online_expires_in = 0;

        for (key, value) in props {
            match key.to_ascii_lowercase().as_str() {
                "id" => id = Some(value.to_text()),
                "shop" => {
                    shop = Some(
                        ShopDomain::new(value.to_text()).map_err(|e| invalid(key, e.to_string()))?,
                    );
                }
                "state" => state = Some(value.to_text()),
                "isonline" => is_online = value.to_bool(key)?,
                "scope" => {
                    scopes = value
                        .to_text()
                        .parse()
                        .map_err(|e: crate::ConfigError| invalid(key, e.to_string()))?;
                }
                "expires" => expires = Some(value.to_datetime(key)?),
                "accesstoken" => access_token = value.to_text(),
                "refreshtoken" => refresh_token = Some(value.to_text()),
                "refreshtokenexpires" => refresh_token_expires = Some(value.to_datetime(key)?),
                "userid" | "onlineaccessinfo" => user_id = Some(value.to_u64(key)?),
                "firstname" => user.first_name = value.to_text(),
                "lastname" => user.last_name = value.to_text(),
                "email" => user.email = value.to_text(),
                "accountowner" => user.account_owner = value.to_bool(key)?,
                "locale" => user.locale = value.to_text(),
                "collaborator" => user.collaborator = value.to_bool(key)?,
                "emailverified" => user.email_verified = value.to_bool(key)?,
                "associateduserscope" => {
                    associated_user_scope = value
                        .to_text()
                        .parse()
                        .map_err(|e: crate::ConfigError| invalid(key, e.to_string()))?;
                }
                "onlineaccessexpiresin" => online_expires_in = value.to_i64(key)?,
                _ => {}
            }
        }

        let id = id.ok_or(SessionError::MissingProperty { property: "id" })?;
        let shop = shop.ok_or(SessionError::MissingProperty { property: "shop" })?;

        let online_access_info = user_id.map(|user_id| {
            user.id = user_id;
            OnlineAccessInfo::new(user, associated_user_scope, online_expires_in)
        });

        Ok(Self {
            id,
            shop,
            state,
            is_online,
            scopes,
            expires,
            access_token,
            refresh_token,
            refresh_token_expires,
            online_access_info,
        })
    }
}
