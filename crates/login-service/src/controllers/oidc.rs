//! OpenID Connect login (also used for Google).
//!
//! The first leg of a login redirects the browser to the provider with a
//! signed `state` blob that remembers where the user wanted to go. On the
//! callback leg the state is verified, the authorization code is exchanged
//! for the user's claims, and the API server is asked to create a session for
//! that identity. Its redirect, carrying the new token, is returned as-is.

use super::{LoginBackend, LoginController};
use crate::clients::{OidcProvider, SessionCreator};
use crate::config::ClusterConfig;
use crate::context::{Cancellation, RequestContext};
use crate::errors::{LoginError, AUTHENTICATE_UNAVAILABLE_MESSAGE};
use crate::observability::hash_for_correlation;
use crate::services::noop_logout;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::secret::ExposeSecret;
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions, UserSessionAuthInfo, UserSessionCreateOptions,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// How long a login state blob stays valid, in seconds.
pub const STATE_TTL_SECONDS: i64 = 600;

/// Allowed clock skew for state timestamps, in seconds.
const STATE_CLOCK_SKEW_SECONDS: i64 = 60;

/// Scopes requested from every provider.
const BASE_SCOPES: &str = "openid email profile";

/// Extra Google scopes needed to look up alternate addresses.
const GOOGLE_PEOPLE_API_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/user.emails.read",
];

/// Claims that carry the user's alternate addresses, when present.
const ALTERNATE_EMAILS_CLAIM: &str = "alternate_emails";

/// Round-tripped through the provider to tie the callback to the login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
    /// Unix seconds when the state was issued.
    pub time: i64,
    pub remote: String,
    pub return_to: String,
}

/// Sign `state` with `key`: `base64url(json).hex(hmac)`.
///
/// # Errors
///
/// Returns `LoginError::Internal` if the state cannot be encoded.
pub fn encode_state(key: &[u8], state: &LoginState) -> Result<String, LoginError> {
    let json = serde_json::to_vec(state)
        .map_err(|e| LoginError::Internal(format!("Failed to encode login state: {}", e)))?;
    let payload = URL_SAFE_NO_PAD.encode(json);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| LoginError::Internal(format!("Invalid state signing key: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload, signature))
}

/// Verify and decode a state blob produced by [`encode_state`].
///
/// # Errors
///
/// Returns `LoginError::BadRequest` when the blob is malformed, the signature
/// does not match, or the state is older than [`STATE_TTL_SECONDS`].
pub fn decode_state(key: &[u8], encoded: &str, now: i64) -> Result<LoginState, LoginError> {
    let invalid = || LoginError::BadRequest("invalid OAuth2 state".to_string());

    let (payload, signature) = encoded.split_once('.').ok_or_else(invalid)?;
    let signature = hex::decode(signature).map_err(|_| invalid())?;

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| LoginError::Internal(format!("Invalid state signing key: {}", e)))?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| invalid())?;

    let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
    let state: LoginState = serde_json::from_slice(&json).map_err(|_| invalid())?;

    let age = now - state.time;
    if age > STATE_TTL_SECONDS || age < -STATE_CLOCK_SKEW_SECONDS {
        return Err(LoginError::BadRequest("expired OAuth2 state".to_string()));
    }

    Ok(state)
}

/// Login controller for OpenID Connect providers.
pub struct OidcLoginController {
    cluster: Arc<ClusterConfig>,
    backend: LoginBackend,
    provider: Arc<dyn OidcProvider>,
    sessions: Arc<dyn SessionCreator>,
    client_id: String,
    email_claim: String,
    email_verified_claim: String,
    username_claim: String,
    use_google_people_api: bool,
}

impl OidcLoginController {
    /// Google login: fixed issuer and claim names.
    pub fn google(
        cluster: Arc<ClusterConfig>,
        provider: Arc<dyn OidcProvider>,
        sessions: Arc<dyn SessionCreator>,
    ) -> Self {
        let google = &cluster.login.google;
        Self {
            backend: LoginBackend::Google,
            client_id: google.client_id.clone(),
            email_claim: "email".to_string(),
            email_verified_claim: "email_verified".to_string(),
            username_claim: String::new(),
            use_google_people_api: google.alternate_email_addresses,
            provider,
            sessions,
            cluster,
        }
    }

    /// Generic OpenID Connect login with configurable claim names.
    pub fn openid_connect(
        cluster: Arc<ClusterConfig>,
        provider: Arc<dyn OidcProvider>,
        sessions: Arc<dyn SessionCreator>,
    ) -> Self {
        let oidc = &cluster.login.openid_connect;
        Self {
            backend: LoginBackend::OpenIdConnect,
            client_id: oidc.client_id.clone(),
            email_claim: oidc.email_claim.clone(),
            email_verified_claim: oidc.email_verified_claim.clone(),
            username_claim: oidc.username_claim.clone(),
            use_google_people_api: false,
            provider,
            sessions,
            cluster,
        }
    }

    pub fn issuer(&self) -> &str {
        self.provider.issuer()
    }

    pub fn email_claim(&self) -> &str {
        &self.email_claim
    }

    pub fn email_verified_claim(&self) -> &str {
        &self.email_verified_claim
    }

    /// Where the provider sends the browser back to.
    pub fn redirect_uri(&self) -> Result<String, LoginError> {
        self.cluster
            .services
            .controller_url
            .join("login")
            .map(String::from)
            .map_err(|e| LoginError::Internal(format!("Invalid controller URL: {}", e)))
    }

    fn state_key(&self) -> &[u8] {
        self.cluster.system_root_token.expose_secret().as_bytes()
    }

    fn scopes(&self) -> String {
        let mut scopes = BASE_SCOPES.to_string();
        if self.use_google_people_api {
            for scope in GOOGLE_PEOPLE_API_SCOPES {
                scopes.push(' ');
                scopes.push_str(scope);
            }
        }
        scopes
    }

    /// First leg: redirect to the provider.
    async fn begin_login(
        &self,
        cancellation: &Cancellation,
        opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        if opts.return_to.is_empty() {
            return Err(LoginError::BadRequest(
                "missing return_to parameter".to_string(),
            ));
        }

        let state = encode_state(
            self.state_key(),
            &LoginState {
                time: chrono::Utc::now().timestamp(),
                remote: opts.remote,
                return_to: opts.return_to,
            },
        )?;

        let redirect_uri = self.redirect_uri()?;
        let mut target = cancellation
            .guard(self.provider.authorization_endpoint())
            .await?;
        target
            .query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes())
            .append_pair("state", &state);

        Ok(LoginResponse {
            redirect_location: target.to_string(),
            html: String::new(),
        })
    }

    /// Callback leg: exchange the code and create a session.
    async fn finish_login(
        &self,
        cancellation: &Cancellation,
        opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        let state = decode_state(self.state_key(), &opts.state, chrono::Utc::now().timestamp())?;

        let redirect_uri = self.redirect_uri()?;
        let claims = cancellation
            .guard(self.provider.exchange_code(&opts.code, &redirect_uri))
            .await?;

        let auth_info = self.auth_info_from_claims(&claims)?;
        debug!(
            target: "login.controller.oidc",
            backend = %self.backend,
            email_hash = %hash_for_correlation(&auth_info.email),
            "Identity provider accepted login"
        );

        let session = cancellation
            .guard(self.sessions.user_session_create(
                &self.cluster.system_root_token,
                &UserSessionCreateOptions {
                    return_to: format!("{},{}", state.remote, state.return_to),
                    auth_info,
                },
            ))
            .await?;

        Ok(LoginResponse {
            redirect_location: session.redirect_location,
            html: String::new(),
        })
    }

    /// Map provider claims to the identity handed to session-create.
    pub fn auth_info_from_claims(
        &self,
        claims: &Map<String, Value>,
    ) -> Result<UserSessionAuthInfo, LoginError> {
        let email = claims
            .get(&self.email_claim)
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                LoginError::Unauthorized(format!(
                    "identity provider did not return an email address in the {:?} claim",
                    self.email_claim
                ))
            })?;

        if !self.email_verified_claim.is_empty() {
            let verified = claims
                .get(&self.email_verified_claim)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !verified {
                return Err(LoginError::Unauthorized(
                    "cannot authenticate using an unverified email address".to_string(),
                ));
            }
        }

        let (first_name, last_name) = names_from_claims(claims);

        let username = if self.username_claim.is_empty() {
            String::new()
        } else {
            claims
                .get(&self.username_claim)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let alternate_emails = claims
            .get(ALTERNATE_EMAILS_CLAIM)
            .and_then(Value::as_array)
            .map(|emails| {
                emails
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|alt| *alt != email)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(UserSessionAuthInfo {
            user_uuid: String::new(),
            email: email.to_string(),
            alternate_emails,
            username,
            first_name,
            last_name,
        })
    }
}

/// Prefer `given_name`/`family_name`; otherwise split `name` at the last word.
fn names_from_claims(claims: &Map<String, Value>) -> (String, String) {
    let claim = |key: &str| {
        claims
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let given = claim("given_name");
    let family = claim("family_name");
    if !given.is_empty() || !family.is_empty() {
        return (given, family);
    }

    let full = claim("name");
    let words: Vec<&str> = full.split_whitespace().collect();
    match words.split_last() {
        Some((last, rest)) if !rest.is_empty() => (rest.join(" "), (*last).to_string()),
        Some((only, _)) => ((*only).to_string(), String::new()),
        None => (String::new(), String::new()),
    }
}

#[async_trait]
impl LoginController for OidcLoginController {
    fn backend(&self) -> Option<LoginBackend> {
        Some(self.backend)
    }

    #[instrument(skip_all, name = "login.controller.oidc.login", fields(callback = !opts.code.is_empty()))]
    async fn login(
        &self,
        ctx: &mut RequestContext<'_>,
        opts: LoginOptions,
    ) -> Result<LoginResponse, LoginError> {
        if opts.code.is_empty() {
            self.begin_login(ctx.cancellation(), opts).await
        } else {
            self.finish_login(ctx.cancellation(), opts).await
        }
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
