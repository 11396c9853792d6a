//! Login controllers and the backend selector.
//!
//! A cluster runs exactly one login backend. [`select_backend`] checks the
//! enable flags once; [`choose_login_controller`] turns the result into the
//! [`LoginController`] every request is dispatched to. An invalid
//! configuration yields an [`ErrorLoginController`] instead of a startup
//! failure, so the process still serves health checks.

pub mod error_controller;
pub mod federated;
pub mod oidc;
pub mod password;
pub mod sso;

pub use error_controller::ErrorLoginController;
pub use federated::FederatedLoginController;
pub use oidc::OidcLoginController;
pub use password::{LdapLoginController, PamLoginController, TestLoginController};
pub use sso::SsoLoginController;

use crate::clients::oidc::HttpOidcProvider;
use crate::clients::{IdentityProxy, OidcProvider, PasswordVerifier, SessionCreator};
use crate::config::{ClusterConfig, GOOGLE_ISSUER};
use crate::context::RequestContext;
use crate::errors::{LoginError, LOGIN_CONFIG_ERROR_MESSAGE};
use crate::observability::metrics;
use async_trait::async_trait;
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions,
};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The login backend kinds a cluster can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginBackend {
    Google,
    OpenIdConnect,
    Sso,
    Pam,
    Ldap,
    Test,
    /// Another cluster is authoritative for logins.
    LoginCluster,
}

impl LoginBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginBackend::Google => "google",
            LoginBackend::OpenIdConnect => "openid_connect",
            LoginBackend::Sso => "sso",
            LoginBackend::Pam => "pam",
            LoginBackend::Ldap => "ldap",
            LoginBackend::Test => "test",
            LoginBackend::LoginCluster => "login_cluster",
        }
    }
}

impl fmt::Display for LoginBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric label for a controller that has no backend.
pub const MISCONFIGURED_LABEL: &str = "misconfigured";

/// The operations every login backend answers.
///
/// Implementations hold no per-request state and are shared across
/// concurrent requests.
#[async_trait]
pub trait LoginController: Send + Sync {
    /// The backend this controller implements, `None` for the error controller.
    fn backend(&self) -> Option<LoginBackend>;

    async fn login(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError>;

    async fn logout(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError>;

    async fn user_authenticate(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: UserAuthenticateOptions,
    ) -> Result<ApiClientAuthorization, LoginError>;
}

/// Backend label for metrics and logs.
pub fn backend_label(controller: &dyn LoginController) -> &'static str {
    controller
        .backend()
        .map_or(MISCONFIGURED_LABEL, |backend| backend.as_str())
}

/// Backends whose enable condition holds, in declaration order.
///
/// The login-cluster backend counts only when it names a cluster other than
/// this one.
pub fn enabled_backends(cluster: &ClusterConfig) -> Vec<LoginBackend> {
    let login = &cluster.login;
    let wants_login_cluster =
        !login.login_cluster.is_empty() && login.login_cluster != cluster.cluster_id;

    [
        (login.google.enable, LoginBackend::Google),
        (login.openid_connect.enable, LoginBackend::OpenIdConnect),
        (login.sso.enable, LoginBackend::Sso),
        (login.pam.enable, LoginBackend::Pam),
        (login.ldap.enable, LoginBackend::Ldap),
        (login.test.enable, LoginBackend::Test),
        (wants_login_cluster, LoginBackend::LoginCluster),
    ]
    .into_iter()
    .filter_map(|(enabled, backend)| enabled.then_some(backend))
    .collect()
}

/// Pick the single enabled backend.
///
/// # Errors
///
/// Returns `LoginError::Configuration` with the fixed configuration message
/// when zero or several backends are enabled.
pub fn select_backend(cluster: &ClusterConfig) -> Result<LoginBackend, LoginError> {
    match enabled_backends(cluster).as_slice() {
        [backend] => Ok(*backend),
        _ => Err(LoginError::Configuration(
            LOGIN_CONFIG_ERROR_MESSAGE.to_string(),
        )),
    }
}

/// Collaborators injected into the controllers.
#[derive(Clone)]
pub struct LoginControllerDeps {
    /// Legacy single sign-on proxy.
    pub identity_proxy: Arc<dyn IdentityProxy>,

    /// Remote session-create call used by token minting.
    pub sessions: Arc<dyn SessionCreator>,

    /// Directory check for the PAM and LDAP backends.
    pub password_verifier: Arc<dyn PasswordVerifier>,

    /// Overrides the HTTP provider built from the issuer.
    pub oidc_provider: Option<Arc<dyn OidcProvider>>,
}

impl fmt::Debug for LoginControllerDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginControllerDeps")
            .field("oidc_provider_override", &self.oidc_provider.is_some())
            .finish_non_exhaustive()
    }
}

/// Build the controller for the configured backend.
///
/// Never fails: configuration problems produce an [`ErrorLoginController`]
/// that returns the problem from every operation.
pub fn choose_login_controller(
    cluster: &ClusterConfig,
    deps: &LoginControllerDeps,
) -> Arc<dyn LoginController> {
    let controller = match select_backend(cluster) {
        Ok(backend) => build_controller(backend, cluster, deps)
            .unwrap_or_else(|e| Arc::new(ErrorLoginController::new(e))),
        Err(e) => Arc::new(ErrorLoginController::new(e)),
    };

    let label = backend_label(controller.as_ref());
    metrics::record_backend_selection(label);
    match controller.backend() {
        Some(backend) => {
            info!(target: "login.controller", backend = %backend, "Login backend selected");
        }
        None => {
            warn!(
                target: "login.controller",
                enabled = enabled_backends(cluster).len(),
                "Login backend misconfigured; all login operations will fail"
            );
        }
    }

    controller
}

fn build_controller(
    backend: LoginBackend,
    cluster: &ClusterConfig,
    deps: &LoginControllerDeps,
) -> Result<Arc<dyn LoginController>, LoginError> {
    let cluster = Arc::new(cluster.clone());
    let login = &cluster.login;

    let controller: Arc<dyn LoginController> = match backend {
        LoginBackend::Google => Arc::new(google_controller(&cluster, deps)?),
        LoginBackend::OpenIdConnect => {
            let provider = oidc_provider(
                deps,
                &login.openid_connect.issuer,
                &login.openid_connect.client_id,
                &login.openid_connect.client_secret,
            )?;
            Arc::new(OidcLoginController::openid_connect(
                Arc::clone(&cluster),
                provider,
                Arc::clone(&deps.sessions),
            ))
        }
        LoginBackend::Sso => Arc::new(SsoLoginController::new(Arc::clone(&deps.identity_proxy))),
        LoginBackend::Pam => Arc::new(PamLoginController::new(
            Arc::clone(&cluster),
            Arc::clone(&deps.password_verifier),
            Arc::clone(&deps.sessions),
        )),
        LoginBackend::Ldap => Arc::new(LdapLoginController::new(
            Arc::clone(&cluster),
            Arc::clone(&deps.password_verifier),
            Arc::clone(&deps.sessions),
        )),
        LoginBackend::Test => Arc::new(TestLoginController::new(
            Arc::clone(&cluster),
            Arc::clone(&deps.sessions),
        )),
        LoginBackend::LoginCluster => Arc::new(FederatedLoginController::new(Arc::clone(&cluster))),
    };

    Ok(controller)
}

fn google_controller(
    cluster: &Arc<ClusterConfig>,
    deps: &LoginControllerDeps,
) -> Result<OidcLoginController, LoginError> {
    let google = &cluster.login.google;
    let provider = oidc_provider(deps, GOOGLE_ISSUER, &google.client_id, &google.client_secret)?;
    Ok(OidcLoginController::google(
        Arc::clone(cluster),
        provider,
        Arc::clone(&deps.sessions),
    ))
}

fn oidc_provider(
    deps: &LoginControllerDeps,
    issuer: &str,
    client_id: &str,
    client_secret: &common::secret::SecretString,
) -> Result<Arc<dyn OidcProvider>, LoginError> {
    if let Some(provider) = &deps.oidc_provider {
        return Ok(Arc::clone(provider));
    }
    if issuer.is_empty() {
        return Err(LoginError::Configuration(
            "OpenID Connect login requires an issuer URL".to_string(),
        ));
    }
    Ok(Arc::new(HttpOidcProvider::new(
        issuer,
        client_id,
        client_secret.clone(),
    )?))
}
