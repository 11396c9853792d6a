use super::{LoginBackend, LoginController};
use crate::config::ClusterConfig;
use crate::context::RequestContext;
use crate::errors::{LoginError, AUTHENTICATE_UNAVAILABLE_MESSAGE, SHOULD_HAVE_REDIRECTED_MESSAGE};
use crate::services::noop_logout;
use async_trait::async_trait;
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions,
};
use std::sync::Arc;

/// Controller for a cluster that delegates logins to another cluster.
///
/// Login requests should never arrive here: callers are redirected to the
/// login cluster before they reach this controller. Logout is answered
/// locally.
#[derive(Debug, Clone)]
pub struct FederatedLoginController {
    cluster: Arc<ClusterConfig>,
}

impl FederatedLoginController {
    pub fn new(cluster: Arc<ClusterConfig>) -> Self {
        Self { cluster }
    }

    /// The cluster that is authoritative for logins.
    pub fn login_cluster(&self) -> &str {
        &self.cluster.login.login_cluster
    }
}

#[async_trait]
impl LoginController for FederatedLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        Some(LoginBackend::LoginCluster)
    }

    async fn login(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        Err(LoginError::BadRequest(
            SHOULD_HAVE_REDIRECTED_MESSAGE.to_string(),
        ))
    }

    async fn logout(
        &self,
        _ctx: &mut RequestContext<'_>,
        opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError> {
        Ok(noop_logout(&self.cluster, &opts))
    }

    async fn user_authenticate(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: UserAuthenticateOptions,
    ) -> Result<ApiClientAuthorization, LoginError> {
        Err(LoginError::BadRequest(
            AUTHENTICATE_UNAVAILABLE_MESSAGE.to_string(),
        ))
    }
}
