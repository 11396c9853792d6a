//! Mock API server for the login controller's remote calls.
//!
//! Wraps a `wiremock` server that answers the session-create callback and the
//! identity-proxy login/logout endpoints the way the real API server does:
//! with a redirect whose `Location` is the result.

use crate::test_ids::TEST_ROOT_TOKEN;
use login_service::services::token_minting::SESSION_CREATE_RETURN_TO;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SESSION_CREATE_PATH: &str = "/auth/controller/callback";

/// Running mock API server.
pub struct MockApiServer {
    server: MockServer,
}

impl MockApiServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL with a trailing slash, suitable for `ClusterConfig::api_server_url`.
    pub fn url(&self) -> Url {
        Url::parse(&format!("{}/", self.server.uri())).expect("mock server URI must parse")
    }

    /// Answer root-authenticated session-create calls with a redirect that
    /// carries the structured token `v2/<uuid>/<secret>`.
    pub async fn mount_session_create(&self, uuid: &str, secret: &str) {
        let mut location =
            Url::parse("https://controller.api.client.invalid/").expect("static URL must parse");
        location
            .query_pairs_mut()
            .append_pair("api_token", &format!("v2/{}/{}", uuid, secret));

        Mock::given(method("POST"))
            .and(path(SESSION_CREATE_PATH))
            .and(header("Authorization", format!("Bearer {}", TEST_ROOT_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(303).insert_header("Location", location.as_str()))
            .mount(&self.server)
            .await;
    }

    /// Reject session-create calls with `status`.
    pub async fn mount_session_create_failure(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(SESSION_CREATE_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("session create rejected"))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /login` with a redirect to `location`.
    pub async fn mount_login_redirect(&self, location: &str) {
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /logout` with a redirect to `location`.
    pub async fn mount_logout_redirect(&self, location: &str) {
        Mock::given(method("GET"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
            .mount(&self.server)
            .await;
    }

    /// Session-create requests received so far.
    pub async fn session_create_requests(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == SESSION_CREATE_PATH)
            .collect()
    }

    /// Form fields of a recorded session-create request.
    pub fn session_create_form(request: &Request) -> SessionCreateForm {
        let mut form = SessionCreateForm::default();
        for (key, value) in url::form_urlencoded::parse(&request.body) {
            match key.as_ref() {
                "return_to" => form.return_to = value.into_owned(),
                "auth_info" => {
                    form.auth_info =
                        serde_json::from_str(&value).expect("auth_info must be valid JSON");
                }
                _ => {}
            }
        }
        form
    }
}

/// Decoded session-create form body.
#[derive(Debug, Default)]
pub struct SessionCreateForm {
    pub return_to: String,
    pub auth_info: serde_json::Value,
}

impl SessionCreateForm {
    /// True when the call used the fixed placeholder return target.
    pub fn is_token_mint(&self) -> bool {
        self.return_to == SESSION_CREATE_RETURN_TO
    }
}
