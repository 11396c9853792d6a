//! Token minting.
//!
//! A root-scoped session-create call on the API server writes a new credential
//! row and answers with a redirect whose `api_token` query parameter carries
//! the token. Minting reads that token back out of the redirect and loads the
//! stored row inside the caller's transaction, so later requests can verify
//! the credential locally. Nothing here writes to the store.

use crate::clients::SessionCreator;
use crate::context::Cancellation;
use crate::errors::LoginError;
use crate::observability::{metrics, outcome};
use crate::repositories::api_client_authorizations::{
    ApiClientAuthorizationRow, CredentialStore,
};
use common::secret::SecretString;
use common::types::{ApiClientAuthorization, UserSessionAuthInfo, UserSessionCreateOptions};
use std::time::Instant;
use tracing::{debug, instrument};
use url::Url;

/// Placeholder return target sent with the session-create call.
///
/// The redirect is never followed. The `.invalid` TLD cannot resolve, and the
/// leading comma marks an empty remote cluster.
pub const SESSION_CREATE_RETURN_TO: &str = ",https://controller.api.client.invalid";

/// Query parameter of the session-create redirect that carries the token.
const API_TOKEN_PARAM: &str = "api_token";

/// Return the secret part of a token.
///
/// Structured tokens look like `v2/<uuid>/<secret>`: with three or more
/// `/`-separated segments the third one is the secret. Anything else,
/// including a two-segment value, is treated as a bare secret.
pub fn extract_token_secret(token: &str) -> &str {
    token.split('/').nth(2).unwrap_or(token)
}

/// Create a session on the API server as `root_token` and return the
/// credential it minted, read back through `tx`.
///
/// Both the remote call and the lookup observe `cancellation`. Errors from
/// either are returned unchanged, except a malformed scopes payload, which is
/// reported as [`LoginError::ScopesDecode`].
#[instrument(skip_all, name = "login.token_mint")]
pub async fn create_api_client_authorization(
    cancellation: &Cancellation,
    tx: &mut (dyn CredentialStore + '_),
    sessions: &dyn SessionCreator,
    root_token: &SecretString,
    auth_info: UserSessionAuthInfo,
) -> Result<ApiClientAuthorization, LoginError> {
    let start = Instant::now();

    let result = mint(cancellation, tx, sessions, root_token, auth_info).await;

    metrics::record_token_mint(outcome(&result), start.elapsed());
    result
}

async fn mint(
    cancellation: &Cancellation,
    tx: &mut (dyn CredentialStore + '_),
    sessions: &dyn SessionCreator,
    root_token: &SecretString,
    auth_info: UserSessionAuthInfo,
) -> Result<ApiClientAuthorization, LoginError> {
    let opts = UserSessionCreateOptions {
        return_to: SESSION_CREATE_RETURN_TO.to_string(),
        auth_info,
    };

    let session = cancellation
        .guard(sessions.user_session_create(root_token, &opts))
        .await?;

    let token = api_token_from_redirect(&session.redirect_location)?;
    let secret = extract_token_secret(&token);

    let row = cancellation
        .guard(tx.find_by_secret(secret))
        .await?
        .ok_or_else(|| {
            LoginError::Database("no api client authorization matches the new session".to_string())
        })?;

    debug!(target: "login.services.token_minting", uuid = %row.uuid, "Loaded minted credential");

    into_authorization(row)
}

fn api_token_from_redirect(location: &str) -> Result<String, LoginError> {
    let target = Url::parse(location).map_err(|e| LoginError::Upstream {
        status: 502,
        message: format!("session-create returned an invalid redirect location: {}", e),
    })?;

    target
        .query_pairs()
        .find(|(key, _)| key == API_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| LoginError::Upstream {
            status: 502,
            message: "session-create redirect carries no api_token".to_string(),
        })
}

fn into_authorization(row: ApiClientAuthorizationRow) -> Result<ApiClientAuthorization, LoginError> {
    let scopes = match row.scopes.as_deref() {
        Some(raw) if !raw.is_empty() => serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| LoginError::ScopesDecode(e.to_string()))?,
        _ => Vec::new(),
    };

    Ok(ApiClientAuthorization {
        uuid: row.uuid,
        api_token: row.api_token,
        expires_at: row.expires_at.map(|t| t.to_rfc3339()),
        scopes,
    })
}
