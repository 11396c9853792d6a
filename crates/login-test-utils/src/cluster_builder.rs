//! Builder for cluster configuration in tests.
//!
//! Starts from a cluster with no login backend enabled; each `with_*` method
//! enables one backend, so tests can build valid and invalid combinations.

use crate::test_ids::*;
use common::secret::SecretString;
use login_service::config::{ClusterConfig, LoginConfig, ServicesConfig, TestUser};
use url::Url;

/// Builder for [`ClusterConfig`].
///
/// # Example
/// ```rust,ignore
/// let cluster = TestClusterBuilder::new()
///     .with_sso()
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestClusterBuilder {
    cluster: ClusterConfig,
}

impl TestClusterBuilder {
    pub fn new() -> Self {
        Self {
            cluster: ClusterConfig {
                cluster_id: TEST_CLUSTER_ID.to_string(),
                system_root_token: SecretString::from(TEST_ROOT_TOKEN),
                api_server_url: parse("http://127.0.0.1:1/"),
                services: ServicesConfig {
                    controller_url: parse(TEST_CONTROLLER_URL),
                    workbench1_url: Some(parse(TEST_WORKBENCH1_URL)),
                    workbench2_url: Some(parse(TEST_WORKBENCH2_URL)),
                },
                login: LoginConfig::default(),
            },
        }
    }

    pub fn api_server_url(mut self, url: Url) -> Self {
        self.cluster.api_server_url = url;
        self
    }

    pub fn controller_url(mut self, url: &str) -> Self {
        self.cluster.services.controller_url = parse(url);
        self
    }

    pub fn workbench1_url(mut self, url: Option<&str>) -> Self {
        self.cluster.services.workbench1_url = url.map(parse);
        self
    }

    pub fn workbench2_url(mut self, url: Option<&str>) -> Self {
        self.cluster.services.workbench2_url = url.map(parse);
        self
    }

    pub fn with_google(mut self) -> Self {
        let google = &mut self.cluster.login.google;
        google.enable = true;
        google.client_id = TEST_OIDC_CLIENT_ID.to_string();
        google.client_secret = SecretString::from(TEST_OIDC_CLIENT_SECRET);
        self
    }

    pub fn with_openid_connect(mut self, issuer: &str) -> Self {
        let oidc = &mut self.cluster.login.openid_connect;
        oidc.enable = true;
        oidc.issuer = issuer.to_string();
        oidc.client_id = TEST_OIDC_CLIENT_ID.to_string();
        oidc.client_secret = SecretString::from(TEST_OIDC_CLIENT_SECRET);
        self
    }

    pub fn with_sso(mut self) -> Self {
        self.cluster.login.sso.enable = true;
        self
    }

    pub fn with_pam(mut self, default_email_domain: &str) -> Self {
        let pam = &mut self.cluster.login.pam;
        pam.enable = true;
        pam.service = "login".to_string();
        pam.default_email_domain = default_email_domain.to_string();
        self
    }

    pub fn with_ldap(mut self) -> Self {
        let ldap = &mut self.cluster.login.ldap;
        ldap.enable = true;
        ldap.url = "ldap://ldap.example:389".to_string();
        ldap.search_base = "dc=example,dc=com".to_string();
        self
    }

    /// Enable the test backend and add one account to it.
    pub fn with_test_user(mut self, username: &str, password: &str, email: &str) -> Self {
        let test = &mut self.cluster.login.test;
        test.enable = true;
        test.users.push(TestUser {
            username: username.to_string(),
            password: SecretString::from(password),
            email: email.to_string(),
        });
        self
    }

    pub fn with_login_cluster(mut self, cluster_id: &str) -> Self {
        self.cluster.login.login_cluster = cluster_id.to_string();
        self
    }

    pub fn build(self) -> ClusterConfig {
        self.cluster
    }
}

impl Default for TestClusterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(url: &str) -> Url {
    Url::parse(url).expect("test URL must parse")
}
