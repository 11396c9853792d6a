use super::{LoginBackend, LoginController};
use crate::clients::IdentityProxy;
use crate::context::RequestContext;
use crate::errors::{LoginError, AUTHENTICATE_UNAVAILABLE_MESSAGE};
use async_trait::async_trait;
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions,
};
use std::sync::Arc;
use tracing::instrument;

/// Legacy single sign-on: login and logout go to the identity proxy as-is.
///
/// The proxy only speaks redirect-based flows, so direct username/password
/// authentication is rejected.
pub struct SsoLoginController {
    proxy: Arc<dyn IdentityProxy>,
}

impl SsoLoginController {
    pub fn new(proxy: Arc<dyn IdentityProxy>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl LoginController for SsoLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        Some(LoginBackend::Sso)
    }

    #[instrument(skip_all, name = "login.controller.sso.login")]
    async fn login(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        ctx.cancellation().guard(self.proxy.login(&opts)).await
    }

    #[instrument(skip_all, name = "login.controller.sso.logout")]
    async fn logout(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError> {
        ctx.cancellation().guard(self.proxy.logout(&opts)).await
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
