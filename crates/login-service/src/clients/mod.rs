//! Remote collaborators of the login controller.
//!
//! - [`IdentityProxy`] forwards interactive login/logout to the API server.
//! - [`SessionCreator`] performs the root-scoped session-create call.
//! - [`OidcProvider`] talks to an OpenID Connect identity provider.
//! - [`PasswordVerifier`] checks username/password pairs for PAM and LDAP.
//!
//! Production implementations live in [`api_server`] and [`oidc`]; [`mock`]
//! provides recording fakes for tests.

pub mod api_server;
pub mod oidc;

use crate::errors::LoginError;
use async_trait::async_trait;
use common::secret::SecretString;
use common::types::{
    LoginOptions, LoginResponse, LogoutOptions, LogoutResponse, UserSessionCreateOptions,
    UserSessionCreateResponse,
};
use serde_json::{Map, Value};
use url::Url;

/// Forwards interactive login and logout to an external identity proxy.
#[async_trait]
pub trait IdentityProxy: Send + Sync {
    async fn login(&self, opts: &LoginOptions) -> Result<LoginResponse, LoginError>;

    async fn logout(&self, opts: &LogoutOptions) -> Result<LogoutResponse, LoginError>;
}

/// Creates a user session on the API server.
#[async_trait]
pub trait SessionCreator: Send + Sync {
    /// Create a session authenticated as `root_token`.
    ///
    /// The response's redirect location carries the new credential in its
    /// `api_token` query parameter.
    async fn user_session_create(
        &self,
        root_token: &SecretString,
        opts: &UserSessionCreateOptions,
    ) -> Result<UserSessionCreateResponse, LoginError>;
}

/// OpenID Connect provider operations used by the OIDC login backend.
#[async_trait]
pub trait OidcProvider: Send + Sync {
    /// Issuer URL the provider was configured with.
    fn issuer(&self) -> &str;

    /// The provider's authorization endpoint.
    async fn authorization_endpoint(&self) -> Result<Url, LoginError>;

    /// Exchange an authorization code and return the user's claims.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Map<String, Value>, LoginError>;
}

/// Identity confirmed by a [`PasswordVerifier`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub username: String,
    /// Empty when the directory has no address on file.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Checks a username/password pair against an external directory.
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    async fn verify(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<VerifiedIdentity, LoginError>;
}

/// Verifier used when no directory integration is wired in.
#[derive(Debug, Clone, Default)]
pub struct UnavailableVerifier;

#[async_trait]
impl PasswordVerifier for UnavailableVerifier {
    async fn verify(
        &self,
        _username: &str,
        _password: &SecretString,
    ) -> Result<VerifiedIdentity, LoginError> {
        Err(LoginError::Configuration(
            "no password verifier is configured for this login backend".to_string(),
        ))
    }
}

/// Mock collaborators for testing.
pub mod mock {
    use super::*;
    use common::secret::ExposeSecret;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Identity proxy that returns canned responses and counts calls.
    #[derive(Debug)]
    pub struct MockIdentityProxy {
        login_response: Result<LoginResponse, LoginError>,
        logout_response: Result<LogoutResponse, LoginError>,
        login_calls: Mutex<Vec<LoginOptions>>,
        logout_calls: Mutex<Vec<LogoutOptions>>,
    }

    impl MockIdentityProxy {
        /// Redirect both operations to the given locations.
        pub fn redirecting(login_location: &str, logout_location: &str) -> Self {
            Self {
                login_response: Ok(LoginResponse {
                    redirect_location: login_location.to_string(),
                    html: String::new(),
                }),
                logout_response: Ok(LogoutResponse {
                    redirect_location: logout_location.to_string(),
                }),
                login_calls: Mutex::new(Vec::new()),
                logout_calls: Mutex::new(Vec::new()),
            }
        }

        /// Fail both operations with `error`.
        pub fn failing(error: LoginError) -> Self {
            Self {
                login_response: Err(error.clone()),
                logout_response: Err(error),
                login_calls: Mutex::new(Vec::new()),
                logout_calls: Mutex::new(Vec::new()),
            }
        }

        pub fn login_calls(&self) -> Vec<LoginOptions> {
            self.login_calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }

        pub fn logout_calls(&self) -> Vec<LogoutOptions> {
            self.logout_calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl IdentityProxy for MockIdentityProxy {
        async fn login(&self, opts: &LoginOptions) -> Result<LoginResponse, LoginError> {
            if let Ok(mut calls) = self.login_calls.lock() {
                calls.push(opts.clone());
            }
            self.login_response.clone()
        }

        async fn logout(&self, opts: &LogoutOptions) -> Result<LogoutResponse, LoginError> {
            if let Ok(mut calls) = self.logout_calls.lock() {
                calls.push(opts.clone());
            }
            self.logout_response.clone()
        }
    }

    /// A session-create call as observed by [`MockSessionCreator`].
    #[derive(Debug, Clone)]
    pub struct RecordedSessionCreate {
        pub root_token: String,
        pub opts: UserSessionCreateOptions,
    }

    /// Session creator that returns a canned redirect and records calls.
    #[derive(Debug)]
    pub struct MockSessionCreator {
        response: Result<UserSessionCreateResponse, LoginError>,
        calls: Mutex<Vec<RecordedSessionCreate>>,
        hang: bool,
    }

    impl MockSessionCreator {
        /// Answer every call with `redirect_location`.
        pub fn redirecting(redirect_location: &str) -> Self {
            Self {
                response: Ok(UserSessionCreateResponse {
                    redirect_location: redirect_location.to_string(),
                }),
                calls: Mutex::new(Vec::new()),
                hang: false,
            }
        }

        /// Fail every call with `error`.
        pub fn failing(error: LoginError) -> Self {
            Self {
                response: Err(error),
                calls: Mutex::new(Vec::new()),
                hang: false,
            }
        }

        /// Never answer. Used to exercise cancellation.
        pub fn hanging() -> Self {
            Self {
                response: Err(LoginError::Internal("unreachable".to_string())),
                calls: Mutex::new(Vec::new()),
                hang: true,
            }
        }

        pub fn calls(&self) -> Vec<RecordedSessionCreate> {
            self.calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl SessionCreator for MockSessionCreator {
        async fn user_session_create(
            &self,
            root_token: &SecretString,
            opts: &UserSessionCreateOptions,
        ) -> Result<UserSessionCreateResponse, LoginError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(RecordedSessionCreate {
                    root_token: root_token.expose_secret().to_string(),
                    opts: opts.clone(),
                });
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.response.clone()
        }
    }

    /// OIDC provider with a fixed authorization endpoint and claim set.
    #[derive(Debug)]
    pub struct MockOidcProvider {
        issuer: String,
        authorization_endpoint: Url,
        claims: Result<Map<String, Value>, LoginError>,
        exchanges: Mutex<Vec<(String, String)>>,
    }

    impl MockOidcProvider {
        pub fn new(authorization_endpoint: Url, claims: Map<String, Value>) -> Self {
            Self {
                issuer: authorization_endpoint.origin().ascii_serialization(),
                authorization_endpoint,
                claims: Ok(claims),
                exchanges: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(authorization_endpoint: Url, error: LoginError) -> Self {
            Self {
                issuer: authorization_endpoint.origin().ascii_serialization(),
                authorization_endpoint,
                claims: Err(error),
                exchanges: Mutex::new(Vec::new()),
            }
        }

        /// `(code, redirect_uri)` pairs exchanged so far.
        pub fn exchanges(&self) -> Vec<(String, String)> {
            self.exchanges
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl OidcProvider for MockOidcProvider {
        fn issuer(&self) -> &str {
            &self.issuer
        }

        async fn authorization_endpoint(&self) -> Result<Url, LoginError> {
            Ok(self.authorization_endpoint.clone())
        }

        async fn exchange_code(
            &self,
            code: &str,
            redirect_uri: &str,
        ) -> Result<Map<String, Value>, LoginError> {
            if let Ok(mut calls) = self.exchanges.lock() {
                calls.push((code.to_string(), redirect_uri.to_string()));
            }
            self.claims.clone()
        }
    }

    /// Password verifier accepting a fixed set of accounts.
    #[derive(Debug, Default)]
    pub struct StaticPasswordVerifier {
        accounts: Vec<(String, String, VerifiedIdentity)>,
        calls: AtomicUsize,
    }

    impl StaticPasswordVerifier {
        pub fn with_account(mut self, username: &str, password: &str, identity: VerifiedIdentity) -> Self {
            self.accounts
                .push((username.to_string(), password.to_string(), identity));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PasswordVerifier for StaticPasswordVerifier {
        async fn verify(
            &self,
            username: &str,
            password: &SecretString,
        ) -> Result<VerifiedIdentity, LoginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.accounts
                .iter()
                .find(|(u, p, _)| u == username && p == password.expose_secret())
                .map(|(_, _, identity)| identity.clone())
                .ok_or_else(|| LoginError::Unauthorized("authentication failed".to_string()))
        }
    }
}
