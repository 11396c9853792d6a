//! Per-request execution context.
//!
//! Every controller operation runs inside a [`RequestContext`]. It carries the
//! request's cancellation signal and deadline, plus the transaction handle
//! that token minting reads from. Controllers never begin or commit that
//! transaction; the caller owns its lifecycle.

use crate::errors::LoginError;
use crate::repositories::api_client_authorizations::CredentialStore;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Error message when the request was cancelled.
pub const CANCELLED_MESSAGE: &str = "context canceled";

/// Error message when the request deadline passed.
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "context deadline exceeded";

/// Cancellation signal and optional deadline for one request.
#[derive(Debug, Clone)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal that is only cancelled through `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Add a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `fut` until it completes, the token is cancelled, or the deadline
    /// passes, whichever comes first. The future is dropped on cancellation.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, LoginError>
    where
        F: Future<Output = Result<T, LoginError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(LoginError::Cancelled(CANCELLED_MESSAGE.to_string())),
            _ = deadline => Err(LoginError::Cancelled(DEADLINE_EXCEEDED_MESSAGE.to_string())),
            result = fut => result,
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Execution context handed to every login controller operation.
pub struct RequestContext<'a> {
    cancellation: Cancellation,
    tx: Option<&'a mut dyn CredentialStore>,
}

impl<'a> RequestContext<'a> {
    /// Context with no transaction attached.
    pub fn new(cancellation: Cancellation) -> Self {
        Self {
            cancellation,
            tx: None,
        }
    }

    /// Attach the request's transaction handle.
    pub fn with_transaction(mut self, tx: &'a mut dyn CredentialStore) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Borrow the cancellation signal together with the request transaction.
    ///
    /// Fails when the caller did not attach a transaction.
    pub fn current_tx(
        &mut self,
    ) -> Result<(&Cancellation, &mut (dyn CredentialStore + 'a)), LoginError> {
        match self.tx.as_deref_mut() {
            Some(tx) => Ok((&self.cancellation, tx)),
            None => Err(LoginError::Internal(
                "no transaction in request context".to_string(),
            )),
        }
    }
}

impl Default for RequestContext<'_> {
    fn default() -> Self {
        Self::new(Cancellation::default())
    }
}
