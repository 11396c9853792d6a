//! Login controller configuration.
//!
//! Configuration is loaded from environment variables. Loading never checks
//! that exactly one login backend is enabled: that rule is enforced by the
//! backend selector so a misconfigured process still starts and answers
//! health checks. Secrets and the database URL are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8003";

/// Default per-request deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default API server base URL (remote session-create and identity proxy).
pub const DEFAULT_API_SERVER_URL: &str = "http://localhost:8004/";

/// Default external URL of this controller, used to build OIDC redirect URIs.
pub const DEFAULT_CONTROLLER_EXTERNAL_URL: &str = "http://localhost:8003/";

/// Issuer used by the Google login backend.
pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";

/// Login controller process configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8003").
    pub bind_address: String,

    /// Deadline applied to each request context.
    pub request_timeout_seconds: u64,

    /// Cluster-wide settings.
    pub cluster: ClusterConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("cluster", &self.cluster)
            .finish()
    }
}

/// Cluster-wide settings the login backends read.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Five-character identifier of this cluster (e.g. "zzzzz").
    pub cluster_id: String,

    /// Token used for root-scoped calls to the API server.
    pub system_root_token: SecretString,

    /// Base URL of the API server.
    pub api_server_url: Url,

    pub services: ServicesConfig,

    pub login: LoginConfig,
}

/// External URLs of the cluster's services.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    /// This controller's external URL.
    pub controller_url: Url,

    /// Legacy web client.
    pub workbench1_url: Option<Url>,

    /// Primary web client.
    pub workbench2_url: Option<Url>,
}

/// One enable flag per backend kind plus backend-specific parameters.
#[derive(Debug, Clone, Default)]
pub struct LoginConfig {
    pub google: GoogleLoginConfig,
    pub openid_connect: OidcLoginConfig,
    pub sso: SsoLoginConfig,
    pub pam: PamLoginConfig,
    pub ldap: LdapLoginConfig,
    pub test: TestLoginConfig,

    /// Cluster id that is authoritative for logins. Empty or equal to this
    /// cluster's id means no federation.
    pub login_cluster: String,
}

#[derive(Debug, Clone)]
pub struct GoogleLoginConfig {
    pub enable: bool,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Request the People API scopes so alternate addresses can be looked up.
    pub alternate_email_addresses: bool,
}

impl Default for GoogleLoginConfig {
    fn default() -> Self {
        Self {
            enable: false,
            client_id: String::new(),
            client_secret: SecretString::from(""),
            alternate_email_addresses: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OidcLoginConfig {
    pub enable: bool,
    pub issuer: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub email_claim: String,
    pub email_verified_claim: String,
    /// Empty means "derive the username from the email address".
    pub username_claim: String,
}

impl Default for OidcLoginConfig {
    fn default() -> Self {
        Self {
            enable: false,
            issuer: String::new(),
            client_id: String::new(),
            client_secret: SecretString::from(""),
            email_claim: "email".to_string(),
            email_verified_claim: "email_verified".to_string(),
            username_claim: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SsoLoginConfig {
    pub enable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PamLoginConfig {
    pub enable: bool,
    pub service: String,
    /// Appended to usernames that carry no domain.
    pub default_email_domain: String,
}

#[derive(Debug, Clone, Default)]
pub struct LdapLoginConfig {
    pub enable: bool,
    pub url: String,
    pub search_base: String,
}

#[derive(Debug, Clone, Default)]
pub struct TestLoginConfig {
    pub enable: bool,
    pub users: Vec<TestUser>,
}

/// Fixed account accepted by the test login backend.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: String,
    pub password: SecretString,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid boolean for {var}: '{value}'")]
    InvalidBool { var: String, value: String },

    #[error("Invalid URL for {var}: {reason}")]
    InvalidUrl { var: String, reason: String },

    #[error("Invalid LOGIN_TEST_USERS entry: {0}")]
    InvalidTestUsers(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let request_timeout_seconds = match vars.get("REQUEST_TIMEOUT_SECONDS") {
            Some(value) => {
                let parsed: u64 = value.parse().map_err(|e| {
                    ConfigError::InvalidRequestTimeout(format!(
                        "REQUEST_TIMEOUT_SECONDS must be a positive integer, got '{}': {}",
                        value, e
                    ))
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidRequestTimeout(
                        "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }
                parsed
            }
            None => DEFAULT_REQUEST_TIMEOUT_SECONDS,
        };

        let cluster = ClusterConfig::from_vars(vars)?;

        Ok(Config {
            database_url,
            bind_address,
            request_timeout_seconds,
            cluster,
        })
    }
}

impl ClusterConfig {
    /// Load the cluster section from a HashMap of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let cluster_id = required(vars, "CLUSTER_ID")?;
        let system_root_token = SecretString::from(required(vars, "SYSTEM_ROOT_TOKEN")?);

        let api_server_url = parse_url(vars, "API_SERVER_URL")?
            .map_or_else(|| default_url("API_SERVER_URL", DEFAULT_API_SERVER_URL), Ok)?;

        let services = ServicesConfig {
            controller_url: parse_url(vars, "CONTROLLER_EXTERNAL_URL")?.map_or_else(
                || default_url("CONTROLLER_EXTERNAL_URL", DEFAULT_CONTROLLER_EXTERNAL_URL),
                Ok,
            )?,
            workbench1_url: parse_url(vars, "WORKBENCH1_URL")?,
            workbench2_url: parse_url(vars, "WORKBENCH2_URL")?,
        };

        let login = LoginConfig {
            google: GoogleLoginConfig {
                enable: parse_bool(vars, "LOGIN_GOOGLE_ENABLE")?,
                client_id: optional(vars, "LOGIN_GOOGLE_CLIENT_ID"),
                client_secret: SecretString::from(optional(vars, "LOGIN_GOOGLE_CLIENT_SECRET")),
                alternate_email_addresses: parse_bool(
                    vars,
                    "LOGIN_GOOGLE_ALTERNATE_EMAIL_ADDRESSES",
                )?,
            },
            openid_connect: OidcLoginConfig {
                enable: parse_bool(vars, "LOGIN_OIDC_ENABLE")?,
                issuer: optional(vars, "LOGIN_OIDC_ISSUER"),
                client_id: optional(vars, "LOGIN_OIDC_CLIENT_ID"),
                client_secret: SecretString::from(optional(vars, "LOGIN_OIDC_CLIENT_SECRET")),
                email_claim: vars
                    .get("LOGIN_OIDC_EMAIL_CLAIM")
                    .cloned()
                    .unwrap_or_else(|| "email".to_string()),
                email_verified_claim: vars
                    .get("LOGIN_OIDC_EMAIL_VERIFIED_CLAIM")
                    .cloned()
                    .unwrap_or_else(|| "email_verified".to_string()),
                username_claim: optional(vars, "LOGIN_OIDC_USERNAME_CLAIM"),
            },
            sso: SsoLoginConfig {
                enable: parse_bool(vars, "LOGIN_SSO_ENABLE")?,
            },
            pam: PamLoginConfig {
                enable: parse_bool(vars, "LOGIN_PAM_ENABLE")?,
                service: vars
                    .get("LOGIN_PAM_SERVICE")
                    .cloned()
                    .unwrap_or_else(|| "login".to_string()),
                default_email_domain: optional(vars, "LOGIN_PAM_DEFAULT_EMAIL_DOMAIN"),
            },
            ldap: LdapLoginConfig {
                enable: parse_bool(vars, "LOGIN_LDAP_ENABLE")?,
                url: optional(vars, "LOGIN_LDAP_URL"),
                search_base: optional(vars, "LOGIN_LDAP_SEARCH_BASE"),
            },
            test: TestLoginConfig {
                enable: parse_bool(vars, "LOGIN_TEST_ENABLE")?,
                users: parse_test_users(vars.get("LOGIN_TEST_USERS").map(String::as_str))?,
            },
            login_cluster: optional(vars, "LOGIN_CLUSTER"),
        };

        Ok(ClusterConfig {
            cluster_id,
            system_root_token,
            api_server_url,
            services,
            login,
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    vars.get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional(vars: &HashMap<String, String>, key: &str) -> String {
    vars.get(key).cloned().unwrap_or_default()
}

fn parse_bool(vars: &HashMap<String, String>, key: &str) -> Result<bool, ConfigError> {
    let Some(value) = vars.get(key) else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        _ => Err(ConfigError::InvalidBool {
            var: key.to_string(),
            value: value.clone(),
        }),
    }
}

fn parse_url(vars: &HashMap<String, String>, key: &str) -> Result<Option<Url>, ConfigError> {
    match vars.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => Url::parse(value)
            .map(Some)
            .map_err(|e| ConfigError::InvalidUrl {
                var: key.to_string(),
                reason: e.to_string(),
            }),
    }
}

fn default_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        var: key.to_string(),
        reason: e.to_string(),
    })
}

/// Parse `user:password:email` entries separated by commas.
fn parse_test_users(value: Option<&str>) -> Result<Vec<TestUser>, ConfigError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.splitn(3, ':').collect::<Vec<_>>().as_slice() {
            [username, password, email] if !username.is_empty() => Ok(TestUser {
                username: (*username).to_string(),
                password: SecretString::from(*password),
                email: (*email).to_string(),
            }),
            _ => Err(ConfigError::InvalidTestUsers(format!(
                "expected user:password:email, got entry with {} field(s)",
                entry.split(':').count()
            ))),
        })
        .collect()
}
