//! Login controller error types.
//!
//! Every operation in this crate returns [`LoginError`]. Client-class variants
//! map to 4xx responses; everything else maps to 5xx. Errors are logged only
//! when they are rendered into an HTTP response, never inside the operations
//! themselves.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned by every operation when the backend configuration is invalid.
pub const LOGIN_CONFIG_ERROR_MESSAGE: &str = "configuration problem: exactly one of Login.Google, Login.OpenIDConnect, Login.SSO, Login.PAM, Login.LDAP, Login.Test, or Login.LoginCluster must be set";

/// Message returned by backends that only support redirect-based login.
pub const AUTHENTICATE_UNAVAILABLE_MESSAGE: &str =
    "username/password authentication is not available";

/// Message returned when a login request reaches a federated cluster.
pub const SHOULD_HAVE_REDIRECTED_MESSAGE: &str = "Should have been redirected to login cluster";

/// Message returned by password backends for the interactive login endpoint.
pub const INTERACTIVE_LOGIN_UNAVAILABLE_MESSAGE: &str = "interactive login is not available";

/// Login controller error type.
///
/// `Clone` so a stored configuration error can be handed back unchanged on
/// every call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("unmarshal scopes: {0}")]
    ScopesDecode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoginError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            LoginError::BadRequest(_) => 400,
            LoginError::Unauthorized(_) => 401,
            LoginError::Upstream { status, .. } if (400..500).contains(status) => *status,
            LoginError::Upstream { .. } => 502,
            LoginError::Cancelled(_) => 503,
            LoginError::Configuration(_)
            | LoginError::Database(_)
            | LoginError::ScopesDecode(_)
            | LoginError::Internal(_) => 500,
        }
    }

    /// True when the caller caused the failure and retrying unchanged won't help.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    fn code(&self) -> &'static str {
        match self {
            LoginError::Configuration(_) => "CONFIGURATION_ERROR",
            LoginError::BadRequest(_) => "BAD_REQUEST",
            LoginError::Unauthorized(_) => "UNAUTHORIZED",
            LoginError::Upstream { .. } => "UPSTREAM_ERROR",
            LoginError::Database(_) => "DATABASE_ERROR",
            LoginError::Cancelled(_) => "CANCELLED",
            LoginError::ScopesDecode(_) => "STORE_FORMAT_ERROR",
            LoginError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.is_client_error() {
            self.to_string()
        } else {
            // Log actual error server-side, return generic message to client
            tracing::error!(target: "login.errors", error = %self, status = status.as_u16(), "Request failed");
            match &self {
                // The configuration problem is safe and useful to show to operators
                LoginError::Configuration(msg) => msg.clone(),
                LoginError::Cancelled(msg) => msg.clone(),
                _ => "An internal error occurred".to_string(),
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert sqlx errors to LoginError
impl From<sqlx::Error> for LoginError {
    fn from(err: sqlx::Error) -> Self {
        LoginError::Database(err.to_string())
    }
}
