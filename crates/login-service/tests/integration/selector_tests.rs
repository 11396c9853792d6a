//! Integration tests for login backend selection
//!
//! Exercises `choose_login_controller` across backend combinations and checks
//! the behaviour of the controller it hands back.

use common::secret::SecretString;
use common::types::{LoginOptions, LogoutOptions, UserAuthenticateOptions};
use login_service::clients::mock::{MockIdentityProxy, MockSessionCreator, StaticPasswordVerifier};
use login_service::context::RequestContext;
use login_service::controllers::{
    backend_label, choose_login_controller, select_backend, LoginBackend, LoginControllerDeps,
    MISCONFIGURED_LABEL,
};
use login_service::errors::{
    LoginError, AUTHENTICATE_UNAVAILABLE_MESSAGE, LOGIN_CONFIG_ERROR_MESSAGE,
    SHOULD_HAVE_REDIRECTED_MESSAGE,
};
use login_test_utils::*;
use std::sync::Arc;

fn deps() -> LoginControllerDeps {
    LoginControllerDeps {
        identity_proxy: Arc::new(MockIdentityProxy::redirecting(
            "https://sso.example/login",
            "https://sso.example/logout",
        )),
        sessions: Arc::new(MockSessionCreator::redirecting(
            "https://controller.api.client.invalid/?api_token=unused",
        )),
        password_verifier: Arc::new(StaticPasswordVerifier::default()),
        oidc_provider: None,
    }
}

fn config_error() -> LoginError {
    LoginError::Configuration(LOGIN_CONFIG_ERROR_MESSAGE.to_string())
}

fn authenticate_options() -> UserAuthenticateOptions {
    UserAuthenticateOptions {
        username: "alice".to_string(),
        password: SecretString::from("pw"),
    }
}

// ============================================================================
// Selection
// ============================================================================

#[tokio::test]
async fn test_single_backend_is_selected() {
    let cases = [
        (TestClusterBuilder::new().with_sso().build(), LoginBackend::Sso),
        (TestClusterBuilder::new().with_pam("example.com").build(), LoginBackend::Pam),
        (TestClusterBuilder::new().with_ldap().build(), LoginBackend::Ldap),
        (
            TestClusterBuilder::new()
                .with_test_user("alice", "pw", "alice@example.com")
                .build(),
            LoginBackend::Test,
        ),
        (
            TestClusterBuilder::new()
                .with_login_cluster(TEST_LOGIN_CLUSTER_ID)
                .build(),
            LoginBackend::LoginCluster,
        ),
    ];

    for (cluster, expected) in cases {
        let controller = choose_login_controller(&cluster, &deps());
        assert_eq!(controller.backend(), Some(expected));
        assert_eq!(backend_label(controller.as_ref()), expected.as_str());
    }
}

#[tokio::test]
async fn test_no_backend_yields_error_controller() {
    let cluster = TestClusterBuilder::new().build();
    let controller = choose_login_controller(&cluster, &deps());

    assert_eq!(controller.backend(), None);
    assert_eq!(backend_label(controller.as_ref()), MISCONFIGURED_LABEL);

    let mut ctx = RequestContext::default();
    let login = controller.login(&mut ctx, LoginOptions::default()).await;
    assert_eq!(login, Err(config_error()));

    let logout = controller.logout(&mut ctx, LogoutOptions::default()).await;
    assert_eq!(logout, Err(config_error()));

    let auth = controller
        .user_authenticate(&mut ctx, authenticate_options())
        .await;
    assert_eq!(auth, Err(config_error()));
}

#[tokio::test]
async fn test_two_backends_yield_error_controller() {
    let cluster = TestClusterBuilder::new()
        .with_sso()
        .with_pam("example.com")
        .build();

    assert_eq!(select_backend(&cluster), Err(config_error()));

    let controller = choose_login_controller(&cluster, &deps());
    let mut ctx = RequestContext::default();
    let err = controller
        .login(&mut ctx, LoginOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), LOGIN_CONFIG_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_login_cluster_naming_self_is_not_federation() {
    let cluster = TestClusterBuilder::new()
        .with_sso()
        .with_login_cluster(TEST_CLUSTER_ID)
        .build();

    let controller = choose_login_controller(&cluster, &deps());
    assert_eq!(controller.backend(), Some(LoginBackend::Sso));
}

#[tokio::test]
async fn test_login_cluster_counts_toward_exactly_one() {
    let cluster = TestClusterBuilder::new()
        .with_sso()
        .with_login_cluster(TEST_LOGIN_CLUSTER_ID)
        .build();

    let controller = choose_login_controller(&cluster, &deps());
    assert_eq!(controller.backend(), None);
}

#[tokio::test]
async fn test_openid_connect_without_issuer_is_misconfigured() {
    let cluster = TestClusterBuilder::new().with_openid_connect("").build();

    let controller = choose_login_controller(&cluster, &deps());
    assert_eq!(controller.backend(), None);
}

// ============================================================================
// Selected controller behaviour
// ============================================================================

#[tokio::test]
async fn test_federated_controller_rejects_login_and_authenticate() {
    let cluster = TestClusterBuilder::new()
        .with_login_cluster(TEST_LOGIN_CLUSTER_ID)
        .build();
    let controller = choose_login_controller(&cluster, &deps());
    let mut ctx = RequestContext::default();

    let err = controller
        .login(&mut ctx, LoginOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), SHOULD_HAVE_REDIRECTED_MESSAGE);
    assert_eq!(err.status_code(), 400);

    let err = controller
        .user_authenticate(&mut ctx, authenticate_options())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), AUTHENTICATE_UNAVAILABLE_MESSAGE);

    let logout = controller
        .logout(&mut ctx, LogoutOptions::default())
        .await
        .unwrap();
    assert_eq!(logout.redirect_location, TEST_WORKBENCH2_URL);
}

#[tokio::test]
async fn test_sso_controller_forwards_to_proxy() {
    let proxy = Arc::new(MockIdentityProxy::redirecting(
        "https://sso.example/login",
        "https://sso.example/logout",
    ));
    let deps = LoginControllerDeps {
        identity_proxy: proxy.clone(),
        ..deps()
    };
    let cluster = TestClusterBuilder::new().with_sso().build();
    let controller = choose_login_controller(&cluster, &deps);
    let mut ctx = RequestContext::default();

    let opts = LoginOptions {
        return_to: "https://wb2.zzzzz.example/".to_string(),
        remote: "yyyyy".to_string(),
        ..Default::default()
    };
    let login = controller.login(&mut ctx, opts.clone()).await.unwrap();
    assert_eq!(login.redirect_location, "https://sso.example/login");
    assert_eq!(proxy.login_calls(), vec![opts]);

    let err = controller
        .user_authenticate(&mut ctx, authenticate_options())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), AUTHENTICATE_UNAVAILABLE_MESSAGE);
}
