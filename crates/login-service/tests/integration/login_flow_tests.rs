//! Integration tests for interactive login and logout over HTTP
//!
//! Runs the real router and the real API server client against a mock API
//! server. None of these flows touch the database.

use login_service::clients::api_server::ApiServerClient;
use login_service::clients::mock::MockOidcProvider;
use login_service::clients::UnavailableVerifier;
use login_service::controllers::LoginControllerDeps;
use login_test_utils::*;
use reqwest::{header::LOCATION, redirect, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use url::Url;

const RETURN_TO: &str = "https://wb2.zzzzz.example/projects";
const AUTHORIZE_URL: &str = "https://idp.example/authorize";

fn deps_for(api: &MockApiServer) -> LoginControllerDeps {
    let client = Arc::new(ApiServerClient::new(api.url()).unwrap());
    LoginControllerDeps {
        identity_proxy: client.clone(),
        sessions: client,
        password_verifier: Arc::new(UnavailableVerifier),
        oidc_provider: None,
    }
}

fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .expect("redirect must carry Location")
        .to_str()
        .unwrap()
        .to_string()
}

fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn alice_claims() -> Map<String, Value> {
    match json!({
        "email": TEST_USER_ALICE_EMAIL,
        "email_verified": true,
        "given_name": "Alice",
        "family_name": "Liddell",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

// ============================================================================
// Legacy SSO
// ============================================================================

#[tokio::test]
async fn test_sso_login_redirects_through_api_server() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    api.mount_login_redirect("https://sso.example/start").await;
    let cluster = TestClusterBuilder::new()
        .api_server_url(api.url())
        .with_sso()
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = no_redirect_client()
        .get(format!("{}/login", server.url()))
        .query(&[("return_to", RETURN_TO)])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "https://sso.example/start");
    Ok(())
}

#[tokio::test]
async fn test_sso_logout_redirects_through_api_server() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    api.mount_logout_redirect("https://sso.example/bye").await;
    let cluster = TestClusterBuilder::new()
        .api_server_url(api.url())
        .with_sso()
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = no_redirect_client()
        .get(format!("{}/logout", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "https://sso.example/bye");
    Ok(())
}

// ============================================================================
// Logout redirect resolution
// ============================================================================

#[tokio::test]
async fn test_logout_prefers_return_to() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let cluster = TestClusterBuilder::new()
        .with_test_user(TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD, TEST_USER_ALICE_EMAIL)
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = no_redirect_client()
        .get(format!("{}/logout", server.url()))
        .query(&[("return_to", "https://elsewhere.example/")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "https://elsewhere.example/");
    Ok(())
}

#[tokio::test]
async fn test_logout_falls_back_to_workbench1() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let cluster = TestClusterBuilder::new()
        .workbench2_url(None)
        .with_test_user(TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD, TEST_USER_ALICE_EMAIL)
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = no_redirect_client()
        .get(format!("{}/logout", server.url()))
        .send()
        .await?;

    assert_eq!(location(&response), TEST_WORKBENCH1_URL);
    Ok(())
}

#[tokio::test]
async fn test_password_backend_rejects_interactive_login() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let cluster = TestClusterBuilder::new()
        .with_test_user(TEST_USER_ALICE, TEST_USER_ALICE_PASSWORD, TEST_USER_ALICE_EMAIL)
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps_for(&api)).await?;

    let response = no_redirect_client()
        .get(format!("{}/login", server.url()))
        .query(&[("return_to", RETURN_TO)])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["message"], "interactive login is not available");
    Ok(())
}

// ============================================================================
// OpenID Connect round trip
// ============================================================================

#[tokio::test]
async fn test_oidc_login_round_trip() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;

    let provider = Arc::new(MockOidcProvider::new(
        Url::parse(AUTHORIZE_URL)?,
        alice_claims(),
    ));
    let deps = LoginControllerDeps {
        oidc_provider: Some(provider.clone()),
        ..deps_for(&api)
    };
    let cluster = TestClusterBuilder::new()
        .api_server_url(api.url())
        .with_openid_connect("https://idp.example")
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps).await?;
    let client = no_redirect_client();

    // First leg: redirect to the provider with a signed state.
    let response = client
        .get(format!("{}/login", server.url()))
        .query(&[("return_to", RETURN_TO)])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let authorize = location(&response);
    assert!(authorize.starts_with(AUTHORIZE_URL));
    assert_eq!(
        query_param(&authorize, "client_id").as_deref(),
        Some(TEST_OIDC_CLIENT_ID)
    );
    assert_eq!(
        query_param(&authorize, "redirect_uri").as_deref(),
        Some("https://ctrl.zzzzz.example/login")
    );
    let state = query_param(&authorize, "state").expect("state must be present");

    // Callback leg: the provider sends the browser back with a code.
    let response = client
        .get(format!("{}/login", server.url()))
        .query(&[("code", "auth-code-1"), ("state", state.as_str())])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        query_param(&location(&response), "api_token"),
        Some(test_token_v2())
    );

    assert_eq!(
        provider.exchanges(),
        vec![(
            "auth-code-1".to_string(),
            "https://ctrl.zzzzz.example/login".to_string()
        )]
    );

    let requests = api.session_create_requests().await;
    assert_eq!(requests.len(), 1);
    let form = MockApiServer::session_create_form(&requests[0]);
    assert_eq!(form.return_to, format!(",{}", RETURN_TO));
    assert_eq!(form.auth_info["email"], TEST_USER_ALICE_EMAIL);
    assert_eq!(form.auth_info["first_name"], "Alice");
    assert_eq!(form.auth_info["last_name"], "Liddell");
    Ok(())
}

#[tokio::test]
async fn test_oidc_callback_with_tampered_state_is_rejected() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let provider = Arc::new(MockOidcProvider::new(
        Url::parse(AUTHORIZE_URL)?,
        alice_claims(),
    ));
    let deps = LoginControllerDeps {
        oidc_provider: Some(provider.clone()),
        ..deps_for(&api)
    };
    let cluster = TestClusterBuilder::new()
        .api_server_url(api.url())
        .with_openid_connect("https://idp.example")
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps).await?;

    let response = no_redirect_client()
        .get(format!("{}/login", server.url()))
        .query(&[("code", "auth-code-1"), ("state", "bm90LXNpZ25lZA.00")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(provider.exchanges().is_empty());
    assert!(api.session_create_requests().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_oidc_login_requires_return_to() -> Result<(), anyhow::Error> {
    let api = MockApiServer::start().await;
    let deps = LoginControllerDeps {
        oidc_provider: Some(Arc::new(MockOidcProvider::new(
            Url::parse(AUTHORIZE_URL)?,
            alice_claims(),
        ))),
        ..deps_for(&api)
    };
    let cluster = TestClusterBuilder::new()
        .with_openid_connect("https://idp.example")
        .build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps).await?;

    let response = no_redirect_client()
        .get(format!("{}/login", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
