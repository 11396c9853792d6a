//! Request and response value types for the login operations.
//!
//! These are the request-scoped objects passed to `Login`, `Logout` and
//! `UserAuthenticate`, the persisted credential record handed back by
//! `UserAuthenticate`, and the payload of the remote session-create call.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters for an interactive login request.
///
/// `code` and `state` are only present on the callback leg of a redirect-based
/// flow (OpenID Connect).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOptions {
    /// Where the user should end up after login.
    #[serde(default)]
    pub return_to: String,

    /// Remote cluster id that started the login, if any.
    #[serde(default)]
    pub remote: String,

    /// Authorization code returned by the identity provider.
    #[serde(default)]
    pub code: String,

    /// Opaque state blob round-tripped through the identity provider.
    #[serde(default)]
    pub state: String,
}

/// Parameters for a logout request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutOptions {
    /// Desired post-logout redirect target. Empty means "use the configured default".
    #[serde(default)]
    pub return_to: String,
}

/// Parameters for direct username/password authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAuthenticateOptions {
    pub username: String,
    pub password: SecretString,
}

/// Result of a login request: either a redirect target or an HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub redirect_location: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
}

/// Result of a logout request. Always carries a redirect target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub redirect_location: String,
}

/// A persisted API credential.
///
/// Created as a side effect of a root-scoped session-create call and read back
/// by secret. This crate never mutates one.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiClientAuthorization {
    pub uuid: String,
    pub api_token: String,

    /// RFC 3339 expiry, `None` when the credential never expires.
    #[serde(default)]
    pub expires_at: Option<String>,

    /// Ordered permission scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl fmt::Debug for ApiClientAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientAuthorization")
            .field("uuid", &self.uuid)
            .field("api_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Identity handed to the remote session-create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSessionAuthInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_uuid: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_emails: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,
}

/// Request body of the remote session-create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSessionCreateOptions {
    pub return_to: String,
    pub auth_info: UserSessionAuthInfo,
}

/// Response of the remote session-create call.
///
/// The redirect location carries the new token in its `api_token` query
/// parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserSessionCreateResponse {
    pub redirect_location: String,
}
