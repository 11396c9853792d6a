//! Observability for the login controller.
//!
//! # Privacy by Default
//!
//! Instrumented functions use `#[instrument(skip_all)]` and allow-list their
//! fields explicitly. Usernames are hashed before they are logged. Passwords,
//! tokens, authorization codes and state blobs never appear in logs or
//! metric labels.

pub mod metrics;

use crate::errors::LoginError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Bounded outcome label for an operation result.
pub fn outcome<T>(result: &Result<T, LoginError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => ErrorCategory::from(e).as_str(),
    }
}

/// Error categories for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input or failed credentials.
    Client,
    /// Invalid backend configuration.
    Configuration,
    /// API server, identity provider or database failure.
    Dependency,
    /// Cancelled or timed out.
    Cancelled,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Client => "client_error",
            ErrorCategory::Configuration => "configuration_error",
            ErrorCategory::Dependency => "dependency_error",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Internal => "internal_error",
        }
    }
}

impl From<&LoginError> for ErrorCategory {
    fn from(err: &LoginError) -> Self {
        match err {
            LoginError::BadRequest(_) | LoginError::Unauthorized(_) => ErrorCategory::Client,
            LoginError::Configuration(_) => ErrorCategory::Configuration,
            LoginError::Upstream { .. } | LoginError::Database(_) | LoginError::ScopesDecode(_) => {
                ErrorCategory::Dependency
            }
            LoginError::Cancelled(_) => ErrorCategory::Cancelled,
            LoginError::Internal(_) => ErrorCategory::Internal,
        }
    }
}
