//! HTTP client for the cluster's API server.
//!
//! The API server plays two roles for the login controller: it is the
//! identity proxy that legacy single sign-on login/logout is forwarded to, and
//! it is the remote side of the root-scoped session-create call that writes a
//! new API credential and answers with a redirect carrying that token.
//!
//! Redirects are never followed: the `Location` header is the result.

use super::{IdentityProxy, SessionCreator};
use crate::errors::LoginError;
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::{
    LoginOptions, LoginResponse, LogoutOptions, LogoutResponse, UserSessionCreateOptions,
    UserSessionCreateResponse,
};
use reqwest::{header::LOCATION, redirect, Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Default timeout for API server requests in seconds.
const API_SERVER_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default connect timeout for API server requests in seconds.
const API_SERVER_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Session-create endpoint path.
const SESSION_CREATE_PATH: &str = "auth/controller/callback";

/// Upper bound on error body text carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP client for API server login, logout, and session-create endpoints.
#[derive(Debug, Clone)]
pub struct ApiServerClient {
    /// HTTP client with configured timeouts and redirects disabled.
    client: Client,

    /// Base URL of the API server.
    base_url: Url,
}

impl ApiServerClient {
    /// Create a new API server client.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, LoginError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_SERVER_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(API_SERVER_CONNECT_TIMEOUT_SECS))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| LoginError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, LoginError> {
        self.base_url
            .join(path)
            .map_err(|e| LoginError::Internal(format!("Invalid API server URL for {}: {}", path, e)))
    }

    /// Return the redirect target of a 3xx response, the body of a 2xx
    /// response, or an upstream error.
    async fn redirect_or_body(response: Response) -> Result<(String, String), LoginError> {
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| LoginError::Upstream {
                    status: status.as_u16(),
                    message: "API server redirect has no Location header".to_string(),
                })?;
            return Ok((location.to_string(), String::new()));
        }

        if status.is_success() {
            let body = response.text().await.map_err(|e| LoginError::Upstream {
                status: status.as_u16(),
                message: format!("Failed to read API server response: {}", e),
            })?;
            return Ok((String::new(), body));
        }

        Err(upstream_error(response).await)
    }
}

async fn upstream_error(response: Response) -> LoginError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();

    LoginError::Upstream {
        status: status.as_u16(),
        message: if detail.is_empty() {
            format!("API server returned {}", status)
        } else {
            format!("API server returned {}: {}", status, detail)
        },
    }
}

fn transport_error(e: reqwest::Error) -> LoginError {
    LoginError::Upstream {
        status: e.status().map_or(0, |s| s.as_u16()),
        message: format!("API server request failed: {}", e),
    }
}

#[async_trait]
impl IdentityProxy for ApiServerClient {
    #[instrument(skip_all, fields(has_return_to = !opts.return_to.is_empty()))]
    async fn login(&self, opts: &LoginOptions) -> Result<LoginResponse, LoginError> {
        let url = self.endpoint("login")?;

        let mut query: Vec<(&str, &str)> = vec![("return_to", opts.return_to.as_str())];
        if !opts.remote.is_empty() {
            query.push(("remote", opts.remote.as_str()));
        }

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let (redirect_location, html) = Self::redirect_or_body(response).await?;
        debug!(target: "login.clients.api_server", redirect = !redirect_location.is_empty(), "Login forwarded");

        Ok(LoginResponse {
            redirect_location,
            html,
        })
    }

    #[instrument(skip_all)]
    async fn logout(&self, opts: &LogoutOptions) -> Result<LogoutResponse, LoginError> {
        let url = self.endpoint("logout")?;

        let response = self
            .client
            .get(url)
            .query(&[("return_to", opts.return_to.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let (redirect_location, _) = Self::redirect_or_body(response).await?;
        debug!(target: "login.clients.api_server", "Logout forwarded");

        Ok(LogoutResponse { redirect_location })
    }
}

#[async_trait]
impl SessionCreator for ApiServerClient {
    #[instrument(skip_all)]
    async fn user_session_create(
        &self,
        root_token: &SecretString,
        opts: &UserSessionCreateOptions,
    ) -> Result<UserSessionCreateResponse, LoginError> {
        let url = self.endpoint(SESSION_CREATE_PATH)?;

        let auth_info = serde_json::to_string(&opts.auth_info)
            .map_err(|e| LoginError::Internal(format!("Failed to encode auth_info: {}", e)))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(root_token.expose_secret())
            .form(&[
                ("return_to", opts.return_to.as_str()),
                ("auth_info", auth_info.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_redirection() {
            let (redirect_location, _) = Self::redirect_or_body(response).await?;
            return Ok(UserSessionCreateResponse { redirect_location });
        }

        if status.is_success() {
            return response
                .json::<UserSessionCreateResponse>()
                .await
                .map_err(|e| LoginError::Upstream {
                    status: status.as_u16(),
                    message: format!("Failed to parse session-create response: {}", e),
                });
        }

        Err(upstream_error(response).await)
    }
}
