//! OpenID Connect provider client.
//!
//! Discovery metadata is fetched from `{issuer}/.well-known/openid-configuration`
//! on first use and kept for the life of the client. A code exchange posts to
//! the token endpoint and then reads the user's claims from the userinfo
//! endpoint with the returned access token.

use super::OidcProvider;
use crate::errors::LoginError;
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};
use url::Url;

/// Timeout for provider requests in seconds.
const OIDC_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Discovery document fields the login flow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OIDC provider reached over HTTP.
#[derive(Debug)]
pub struct HttpOidcProvider {
    http_client: Client,
    issuer: String,
    client_id: String,
    client_secret: SecretString,
    discovery: OnceCell<OidcDiscovery>,
}

impl HttpOidcProvider {
    /// Create a provider client for `issuer`.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Internal` if the HTTP client cannot be built.
    pub fn new(
        issuer: &str,
        client_id: &str,
        client_secret: SecretString,
    ) -> Result<Self, LoginError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(OIDC_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LoginError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            issuer: issuer.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret,
            discovery: OnceCell::new(),
        })
    }

    /// Fetch (once) and return the provider's discovery document.
    pub async fn discover(&self) -> Result<&OidcDiscovery, LoginError> {
        self.discovery
            .get_or_try_init(|| async {
                let discovery_url = format!("{}/.well-known/openid-configuration", self.issuer);
                info!(target: "login.clients.oidc", issuer = %self.issuer, "Fetching OIDC discovery document");

                let response = self
                    .http_client
                    .get(&discovery_url)
                    .send()
                    .await
                    .map_err(|e| provider_error(0, format!("Failed to fetch OIDC discovery: {}", e)))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(provider_error(
                        status.as_u16(),
                        format!("OIDC discovery failed with status: {}", status),
                    ));
                }

                let discovery: OidcDiscovery = response.json().await.map_err(|e| {
                    provider_error(0, format!("Failed to parse OIDC discovery response: {}", e))
                })?;

                if discovery.authorization_endpoint.is_empty() {
                    return Err(provider_error(
                        0,
                        "OIDC discovery: missing 'authorization_endpoint' field".to_string(),
                    ));
                }
                if discovery.token_endpoint.is_empty() {
                    return Err(provider_error(
                        0,
                        "OIDC discovery: missing 'token_endpoint' field".to_string(),
                    ));
                }

                Ok(discovery)
            })
            .await
    }
}

/// Provider failures surface as bad-gateway errors unless the provider
/// itself rejected the request.
fn provider_error(status: u16, message: String) -> LoginError {
    LoginError::Upstream { status, message }
}

#[async_trait]
impl OidcProvider for HttpOidcProvider {
    fn issuer(&self) -> &str {
        &self.issuer
    }

    async fn authorization_endpoint(&self) -> Result<Url, LoginError> {
        let discovery = self.discover().await?;
        Url::parse(&discovery.authorization_endpoint).map_err(|e| {
            provider_error(0, format!("Invalid authorization endpoint: {}", e))
        })
    }

    #[instrument(skip_all, fields(issuer = %self.issuer))]
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Map<String, Value>, LoginError> {
        let discovery = self.discover().await?;

        let response = self
            .http_client
            .post(&discovery.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| provider_error(0, format!("Token exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // An invalid or replayed code is the caller's problem.
            return Err(if status.is_client_error() {
                LoginError::Unauthorized(format!("error in OAuth2 exchange: {}", status))
            } else {
                provider_error(status.as_u16(), format!("Token endpoint returned {}", status))
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| provider_error(0, format!("Failed to parse token response: {}", e)))?;

        if discovery.userinfo_endpoint.is_empty() {
            return Err(provider_error(
                0,
                "OIDC discovery: missing 'userinfo_endpoint' field".to_string(),
            ));
        }

        let response = self
            .http_client
            .get(&discovery.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| provider_error(0, format!("Userinfo request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(provider_error(
                status.as_u16(),
                format!("Userinfo endpoint returned {}", status),
            ));
        }

        let claims: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| provider_error(0, format!("Failed to parse userinfo claims: {}", e)))?;

        debug!(target: "login.clients.oidc", claim_count = claims.len(), "Fetched userinfo claims");
        Ok(claims)
    }
}
