//! Integration tests for username/password authentication
//!
//! Controller-level tests run the real API server client against a mock API
//! server and an in-memory credential store. The HTTP tests marked
//! `#[ignore]` need PostgreSQL (`DATABASE_URL`).

use common::secret::SecretString;
use common::types::UserAuthenticateOptions;
use login_service::clients::api_server::ApiServerClient;
use login_service::clients::UnavailableVerifier;
use login_service::context::RequestContext;
use login_service::controllers::{choose_login_controller, LoginControllerDeps};
use login_service::errors::{LoginError, AUTHENTICATE_UNAVAILABLE_MESSAGE, LOGIN_CONFIG_ERROR_MESSAGE};
use login_service::repositories::api_client_authorizations::memory::InMemoryCredentialStore;
use login_service::repositories::api_client_authorizations::ApiClientAuthorizationRow;
use login_test_utils::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;

fn deps_for(api: &MockApiServer) -> LoginControllerDeps {
    let client = Arc::new(ApiServerClient::new(api.url()).unwrap());
    LoginControllerDeps {
        identity_proxy: client.clone(),
        sessions: client,
        password_verifier: Arc::new(UnavailableVerifier),
        oidc_provider: None,
    }
}

fn alice_cluster(api: &MockApiServer) -> login_service::config::ClusterConfig {
    TestClusterBuilder::new()
        .api_server_url(api.url())
        .with_test_user(TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD, TEST_USER_ALICE_EMAIL)
        .build()
}

fn alice_row(scopes: Option<&str>) -> ApiClientAuthorizationRow {
    ApiClientAuthorizationRow {
        uuid: TEST_TOKEN_UUID.to_string(),
        api_token: TEST_TOKEN_SECRET.to_string(),
        expires_at: None,
        scopes: scopes.map(str::to_string),
    }
}

fn credentials(username: &str, password: &str) -> UserAuthenticateOptions {
    UserAuthenticateOptions {
        username: username.to_string(),
        password: SecretString::from(password),
    }
}

// ============================================================================
// Controller level (no database)
// ============================================================================

#[tokio::test]
async fn test_test_backend_mints_token_through_api_server() {
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
    let controller = choose_login_controller(&alice_cluster(&api), &deps_for(&api));

    let mut store = InMemoryCredentialStore::with_rows([alice_row(Some(r#"["all"]"#))]);
    let mut ctx = RequestContext::default().with_transaction(&mut store);

    let auth = controller
        .user_authenticate(
            &mut ctx,
            credentials(TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD),
        )
        .await
        .unwrap();

    assert_eq!(auth.uuid, TEST_TOKEN_UUID);
    assert_eq!(auth.api_token, TEST_TOKEN_SECRET);
    assert_eq!(auth.scopes, vec!["all".to_string()]);

    let requests = api.session_create_requests().await;
    assert_eq!(requests.len(), 1);
    let form = MockApiServer::session_create_form(&requests[0]);
    assert!(form.is_token_mint());
    assert_eq!(form.auth_info["email"], TEST_USER_ALICE_EMAIL);
}

#[tokio::test]
async fn test_wrong_password_never_reaches_api_server() {
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
    let controller = choose_login_controller(&alice_cluster(&api), &deps_for(&api));

    let mut store = InMemoryCredentialStore::with_rows([alice_row(None)]);
    let mut ctx = RequestContext::default().with_transaction(&mut store);

    let err = controller
        .user_authenticate(&mut ctx, credentials(TEST_USER_ALICE, "wrong"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LoginError::Unauthorized(
            "authentication failed for user \"alice\" with password len=5".to_string()
        )
    );
    assert!(api.session_create_requests().await.is_empty());
}

#[tokio::test]
async fn test_session_create_rejection_is_passed_through() {
    let api = MockApiServer::start().await;
    api.mount_session_create_failure(403).await;
    let controller = choose_login_controller(&alice_cluster(&api), &deps_for(&api));

    let mut store = InMemoryCredentialStore::with_rows([alice_row(None)]);
    let mut ctx = RequestContext::default().with_transaction(&mut store);

    let err = controller
        .user_authenticate(
            &mut ctx,
            credentials(TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::Upstream { status: 403, .. }));
    assert!(store.lookups().is_empty());
}

// ============================================================================
// HTTP level
// ============================================================================

async fn post_authenticate(
    server: &TestLoginServer,
    username: &str,
    password: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(format!("{}/arvados/v1/users/authenticate", server.url()))
        .json(&json!({"username": username, "password": password}))
        .send()
        .await?)
}

#[tokio::test]
async fn test_authenticate_without_database_fails_at_lookup() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
    let server =
        TestLoginServer::spawn_without_database(&alice_cluster(&api), deps_for(&api)).await?;

    let response = post_authenticate(&server, TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    // The session was minted before the credential lookup hit the pool.
    assert_eq!(api.session_create_requests().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_authenticate_wrong_password_without_database_is_unauthorized(
) -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let server =
        TestLoginServer::spawn_without_database(&alice_cluster(&api), deps_for(&api)).await?;

    let response = post_authenticate(&server, TEST_USER_ALICE, "not-the-password").await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(api.session_create_requests().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_federated_authenticate_without_database_is_bad_request() -> Result<(), anyhow::Error>
{
    let api = MockApiServer::start().await;
    let cluster = TestClusterBuilder::new()
        .api_server_url(api.url())
        .with_login_cluster(TEST_LOGIN_CLUSTER_ID)
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = post_authenticate(&server, TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], AUTHENTICATE_UNAVAILABLE_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_misconfigured_authenticate_without_database_is_configuration_error(
) -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let cluster = TestClusterBuilder::new().api_server_url(api.url()).build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = post_authenticate(&server, TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    assert_eq!(body["error"]["message"], LOGIN_CONFIG_ERROR_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_authenticate_rejects_malformed_body() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let server =
        TestLoginServer::spawn_without_database(&alice_cluster(&api), deps_for(&api)).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/arvados/v1/users/authenticate", server.url()))
        .json(&json!({"username": TEST_USER_ALICE}))
        .send()
        .await?;

    assert!(response.status().is_client_error());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_authenticate_e2e(pool: PgPool) -> Result<(), anyhow::Error> {
    insert_credential(&pool, TEST_TOKEN_UUID, TEST_TOKEN_SECRET, Some(r#"["all"]"#), None)
        .await?;
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
    let server = TestLoginServer::spawn(pool, &alice_cluster(&api), deps_for(&api)).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/arvados/v1/users/authenticate", server.url()))
        .json(&json!({"username": TEST_USER_ALICE, "password": TEST_USER_ALICE_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["uuid"], TEST_TOKEN_UUID);
    assert_eq!(body["api_token"], TEST_TOKEN_SECRET);
    assert_eq!(body["scopes"], json!(["all"]));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_authenticate_wrong_password_e2e(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
    let server = TestLoginServer::spawn(pool, &alice_cluster(&api), deps_for(&api)).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/arvados/v1/users/authenticate", server.url()))
        .json(&json!({"username": TEST_USER_ALICE, "password": "nope"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(api.session_create_requests().await.is_empty());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_authenticate_corrupt_scopes_e2e(pool: PgPool) -> Result<(), anyhow::Error> {
    insert_credential(&pool, TEST_TOKEN_UUID, TEST_TOKEN_SECRET, Some("{broken"), None).await?;
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
    let server = TestLoginServer::spawn(pool, &alice_cluster(&api), deps_for(&api)).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/arvados/v1/users/authenticate", server.url()))
        .json(&json!({"username": TEST_USER_ALICE, "password": TEST_USER_ALICE_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "STORE_FORMAT_ERROR");
    Ok(())
}
