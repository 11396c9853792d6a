//! Credential store that opens its database transaction on first use.
//!
//! Backends that never read a credential (federation, SSO, a misconfigured
//! cluster, a rejected password) finish without touching the pool, so their
//! own errors reach the caller even when the database is down.

use super::api_client_authorizations::{ApiClientAuthorizationRow, CredentialStore};
use crate::context::Cancellation;
use crate::errors::LoginError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

/// Postgres transaction begun on the first lookup.
pub struct LazyTransaction {
    pool: PgPool,
    cancellation: Cancellation,
    tx: Option<Transaction<'static, Postgres>>,
}

impl LazyTransaction {
    pub fn new(pool: PgPool, cancellation: Cancellation) -> Self {
        Self {
            pool,
            cancellation,
            tx: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.tx.is_some()
    }

    /// Commit the transaction if one was begun.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Database` if the commit fails.
    pub async fn commit(self) -> Result<(), LoginError> {
        if let Some(tx) = self.tx {
            tx.commit().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for LazyTransaction {
    async fn find_by_secret(
        &mut self,
        secret: &str,
    ) -> Result<Option<ApiClientAuthorizationRow>, LoginError> {
        if self.tx.is_none() {
            debug!(target: "login.repositories", "Beginning credential transaction");
            let pool = &self.pool;
            let tx = self
                .cancellation
                .guard(async { pool.begin().await.map_err(LoginError::from) })
                .await?;
            self.tx = Some(tx);
        }

        let tx = self.tx.as_mut().ok_or_else(|| {
            LoginError::Internal("credential transaction was not started".to_string())
        })?;
        CredentialStore::find_by_secret(&mut **tx, secret).await
    }
}
