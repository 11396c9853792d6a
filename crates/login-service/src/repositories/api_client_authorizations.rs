//! API client authorization lookups.
//!
//! Rows in `api_client_authorizations` are written by the API server as a side
//! effect of session creation. This module only reads them, by secret.

use crate::errors::LoginError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use std::fmt;

/// Stored credential row (maps to api_client_authorizations table).
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiClientAuthorizationRow {
    pub uuid: String,
    pub api_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// JSON array of scope strings, as stored.
    pub scopes: Option<String>,
}

impl fmt::Debug for ApiClientAuthorizationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientAuthorizationRow")
            .field("uuid", &self.uuid)
            .field("api_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Transaction-scoped handle to the persisted credential store.
#[async_trait]
pub trait CredentialStore: Send {
    /// Look up a single credential by its secret.
    async fn find_by_secret(
        &mut self,
        secret: &str,
    ) -> Result<Option<ApiClientAuthorizationRow>, LoginError>;
}

#[async_trait]
impl CredentialStore for PgConnection {
    async fn find_by_secret(
        &mut self,
        secret: &str,
    ) -> Result<Option<ApiClientAuthorizationRow>, LoginError> {
        let row = sqlx::query_as::<_, ApiClientAuthorizationRow>(
            r#"
            SELECT uuid, api_token, expires_at, scopes
            FROM api_client_authorizations
            WHERE api_token = $1
            "#,
        )
        .bind(secret)
        .fetch_optional(&mut *self)
        .await
        .map_err(|e| {
            LoginError::Database(format!("Failed to fetch api client authorization: {}", e))
        })?;

        Ok(row)
    }
}

/// In-memory credential store for tests and local tooling.
pub mod memory {
    use super::*;
    use std::collections::HashMap;

    /// Credential store backed by a `HashMap` keyed by secret.
    #[derive(Debug, Default)]
    pub struct InMemoryCredentialStore {
        rows: HashMap<String, ApiClientAuthorizationRow>,
        lookups: Vec<String>,
        failure: Option<LoginError>,
    }

    impl InMemoryCredentialStore {
        /// Create a store holding `rows`.
        pub fn with_rows(rows: impl IntoIterator<Item = ApiClientAuthorizationRow>) -> Self {
            let mut store = Self::default();
            for row in rows {
                store.insert(row);
            }
            store
        }

        /// Create a store whose every lookup fails with `error`.
        pub fn failing(error: LoginError) -> Self {
            Self {
                failure: Some(error),
                ..Self::default()
            }
        }

        pub fn insert(&mut self, row: ApiClientAuthorizationRow) {
            self.rows.insert(row.api_token.clone(), row);
        }

        /// Secrets looked up so far, in order.
        pub fn lookups(&self) -> &[String] {
            &self.lookups
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn find_by_secret(
            &mut self,
            secret: &str,
        ) -> Result<Option<ApiClientAuthorizationRow>, LoginError> {
            self.lookups.push(secret.to_string());
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            Ok(self.rows.get(secret).cloned())
        }
    }
}
