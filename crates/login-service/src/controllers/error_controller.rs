use super::{LoginBackend, LoginController};
use crate::context::RequestContext;
use crate::errors::LoginError;
use async_trait::async_trait;
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions,
};

/// Controller that fails every operation with the same stored error.
///
/// Used when the login configuration is invalid.
#[derive(Debug, Clone)]
pub struct ErrorLoginController {
    error: LoginError,
}

impl ErrorLoginController {
    pub fn new(error: LoginError) -> Self {
        Self { error }
    }

    pub fn error(&self) -> &LoginError {
        &self.error
    }
}

#[async_trait]
impl LoginController for ErrorLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        None
    }

    async fn login(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        Err(self.error.clone())
    }

    async fn logout(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: LogoutOptions,
    ) -> Result<LogoutResponse, LoginError> {
        Err(self.error.clone())
    }

    async fn user_authenticate(
        &self,
        _ctx: &mut RequestContext<'_>,
        _opts: UserAuthenticateOptions,
    ) -> Result<ApiClientAuthorization, LoginError> {
        Err(self.error.clone())
    }
}
