//! Integration tests for the operational endpoints
//!
//! A misconfigured login backend must not stop the process from serving
//! health checks.

use login_service::clients::mock::{MockIdentityProxy, MockSessionCreator};
use login_service::clients::UnavailableVerifier;
use login_service::controllers::LoginControllerDeps;
use login_service::errors::LOGIN_CONFIG_ERROR_MESSAGE;
use login_test_utils::*;
use reqwest::StatusCode;
use std::sync::Arc;

fn deps() -> LoginControllerDeps {
    LoginControllerDeps {
        identity_proxy: Arc::new(MockIdentityProxy::redirecting("", "")),
        sessions: Arc::new(MockSessionCreator::redirecting("")),
        password_verifier: Arc::new(UnavailableVerifier),
        oidc_provider: None,
    }
}

#[tokio::test]
async fn test_health_ok_with_misconfigured_backend() -> Result<(), anyhow::Error> {
    let cluster = TestClusterBuilder::new().with_sso().with_ldap().build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps()).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_ready_reports_misconfigured_backend() -> Result<(), anyhow::Error> {
    let cluster = TestClusterBuilder::new().build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps()).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["login_backend"], "misconfigured");
    Ok(())
}

#[tokio::test]
async fn test_ready_reports_unreachable_database() -> Result<(), anyhow::Error> {
    let cluster = TestClusterBuilder::new().with_sso().build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps()).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["database"], "unhealthy");
    assert_eq!(body["login_backend"], "sso");
    Ok(())
}

#[tokio::test]
async fn test_login_on_misconfigured_backend_reports_problem() -> Result<(), anyhow::Error> {
    let cluster = TestClusterBuilder::new().build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps()).await?;

    let response = reqwest::get(format!(
        "{}/login?return_to=https://wb2.zzzzz.example/",
        server.url()
    ))
    .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    assert_eq!(body["error"]["message"], LOGIN_CONFIG_ERROR_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() -> Result<(), anyhow::Error> {
    let cluster = TestClusterBuilder::new().with_sso().build();
    let server = TestLoginServer::spawn_without_database(&cluster, deps()).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
