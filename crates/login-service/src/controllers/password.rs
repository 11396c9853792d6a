//! Username/password backends: test accounts, PAM and LDAP.
//!
//! None of these offer an interactive login page. A successful
//! `user_authenticate` mints an API token for the verified identity through
//! the request transaction.

use super::{LoginBackend, LoginController};
use crate::clients::{PasswordVerifier, SessionCreator, VerifiedIdentity};
use crate::config::ClusterConfig;
use crate::context::RequestContext;
use crate::errors::{LoginError, INTERACTIVE_LOGIN_UNAVAILABLE_MESSAGE};
use crate::observability::hash_for_correlation;
use crate::services::{create_api_client_authorization, noop_logout};
use async_trait::async_trait;
use common::secret::ExposeSecret;
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions, UserSessionAuthInfo,
};
use std::sync::Arc;
use tracing::{debug, instrument};

fn interactive_login_unavailable() -> LoginError {
    LoginError::BadRequest(INTERACTIVE_LOGIN_UNAVAILABLE_MESSAGE.to_string())
}

fn require_username(opts: &UserAuthenticateOptions) -> Result<(), LoginError> {
    if opts.username.is_empty() {
        return Err(LoginError::BadRequest("username is required".to_string()));
    }
    Ok(())
}

/// Mint a token for `auth_info` inside the request transaction.
async fn mint_for(
    ctx: &mut RequestContext<'_>,
    cluster: &ClusterConfig,
    sessions: &dyn SessionCreator,
    auth_info: UserSessionAuthInfo,
) -> Result<ApiClientAuthorization, LoginError> {
    let (cancellation, tx) = ctx.current_tx()?;
    create_api_client_authorization(
        cancellation,
        tx,
        sessions,
        &cluster.system_root_token,
        auth_info,
    )
    .await
}

/// Accepts the fixed accounts listed in the cluster configuration.
pub struct TestLoginController {
    cluster: Arc<ClusterConfig>,
    sessions: Arc<dyn SessionCreator>,
}

impl TestLoginController {
    pub fn new(cluster: Arc<ClusterConfig>, sessions: Arc<dyn SessionCreator>) -> Self {
        Self { cluster, sessions }
    }
}

#[async_trait]
impl LoginController for TestLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        Some(LoginBackend::Test)
    }

    async fn login(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        Err(interactive_login_unavailable())
    }

    async fn logout(
        &self,
        _ctx: &mut RequestContext<'_>,
        opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError> {
        Ok(noop_logout(&self.cluster, &opts))
    }

    #[instrument(skip_all, name = "login.controller.test.user_authenticate")]
    async fn user_authenticate(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: UserAuthenticateOptions,
    ) -> Result<ApiClientAuthorization, LoginError> {
        let password = opts.password.expose_secret();
        let user = self
            .cluster
            .login
            .test
            .users
            .iter()
            .find(|u| u.username == opts.username && u.password.expose_secret() == password)
            .ok_or_else(|| {
                LoginError::Unauthorized(format!(
                    "authentication failed for user {:?} with password len={}",
                    opts.username,
                    password.len()
                ))
            })?;

        debug!(
            target: "login.controller.test",
            user_hash = %hash_for_correlation(&user.username),
            "Test user authenticated"
        );

        let auth_info = UserSessionAuthInfo {
            email: user.email.clone(),
            username: user.username.clone(),
            ..Default::default()
        };
        mint_for(ctx, &self.cluster, self.sessions.as_ref(), auth_info).await
    }
}

/// Verifies credentials through the host's PAM stack.
pub struct PamLoginController {
    cluster: Arc<ClusterConfig>,
    verifier: Arc<dyn PasswordVerifier>,
    sessions: Arc<dyn SessionCreator>,
}

impl PamLoginController {
    pub fn new(
        cluster: Arc<ClusterConfig>,
        verifier: Arc<dyn PasswordVerifier>,
        sessions: Arc<dyn SessionCreator>,
    ) -> Self {
        Self {
            cluster,
            verifier,
            sessions,
        }
    }

    /// Email for a PAM user: the verifier's address, or the username with
    /// the default domain appended when it has none.
    fn email_for(&self, username: &str, identity: &VerifiedIdentity) -> String {
        if !identity.email.is_empty() {
            return identity.email.clone();
        }
        let domain = &self.cluster.login.pam.default_email_domain;
        if domain.is_empty() || username.contains('@') {
            username.to_string()
        } else {
            format!("{}@{}", username, domain)
        }
    }
}

#[async_trait]
impl LoginController for PamLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        Some(LoginBackend::Pam)
    }

    async fn login(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        Err(interactive_login_unavailable())
    }

    async fn logout(
        &self,
        _ctx: &mut RequestContext<'_>,
        opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError> {
        Ok(noop_logout(&self.cluster, &opts))
    }

    #[instrument(skip_all, name = "login.controller.pam.user_authenticate")]
    async fn user_authenticate(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: UserAuthenticateOptions,
    ) -> Result<ApiClientAuthorization, LoginError> {
        require_username(&opts)?;

        let identity = ctx
            .cancellation()
            .guard(self.verifier.verify(&opts.username, &opts.password))
            .await?;

        let username = if identity.username.is_empty() {
            opts.username.clone()
        } else {
            identity.username.clone()
        };
        let auth_info = UserSessionAuthInfo {
            email: self.email_for(&username, &identity),
            username,
            first_name: identity.first_name,
            last_name: identity.last_name,
            ..Default::default()
        };
        mint_for(ctx, &self.cluster, self.sessions.as_ref(), auth_info).await
    }
}

/// Verifies credentials against an LDAP directory.
pub struct LdapLoginController {
    cluster: Arc<ClusterConfig>,
    verifier: Arc<dyn PasswordVerifier>,
    sessions: Arc<dyn SessionCreator>,
}

impl LdapLoginController {
    pub fn new(
        cluster: Arc<ClusterConfig>,
        verifier: Arc<dyn PasswordVerifier>,
        sessions: Arc<dyn SessionCreator>,
    ) -> Self {
        Self {
            cluster,
            verifier,
            sessions,
        }
    }
}

#[async_trait]
impl LoginController for LdapLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        Some(LoginBackend::Ldap)
    }

    async fn login(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        Err(interactive_login_unavailable())
    }

    async fn logout(
        &self,
        _ctx: &mut RequestContext<'_>,
        opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError> {
        Ok(noop_logout(&self.cluster, &opts))
    }

    #[instrument(skip_all, name = "login.controller.ldap.user_authenticate")]
    async fn user_authenticate(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: UserAuthenticateOptions,
    ) -> Result<ApiClientAuthorization, LoginError> {
        require_username(&opts)?;

        let identity = ctx
            .cancellation()
            .guard(self.verifier.verify(&opts.username, &opts.password))
            .await?;

        if identity.email.is_empty() {
            return Err(LoginError::Unauthorized(
                "cannot log in: no email address found in directory entry".to_string(),
            ));
        }

        let auth_info = UserSessionAuthInfo {
            email: identity.email,
            username: if identity.username.is_empty() {
                opts.username.clone()
            } else {
                identity.username
            },
            first_name: identity.first_name,
            last_name: identity.last_name,
            ..Default::default()
        };
        mint_for(ctx, &self.cluster, self.sessions.as_ref(), auth_info).await
    }
}
