//! Fixed test IDs for deterministic tests
//!
//! All identifiers are fixed so assertions can compare exact values.

// Cluster IDs
pub const TEST_CLUSTER_ID: &str = "zzzzz";
pub const TEST_LOGIN_CLUSTER_ID: &str = "yyyyy";

// Root token used for session-create calls
pub const TEST_ROOT_TOKEN: &str = "test-root-token-do-not-use-in-production";

// Service URLs
pub const TEST_CONTROLLER_URL: &str = "https://ctrl.zzzzz.example/";
pub const TEST_WORKBENCH1_URL: &str = "https://wb1.zzzzz.example/";
pub const TEST_WORKBENCH2_URL: &str = "https://wb2.zzzzz.example/";

// Minted credential
pub const TEST_TOKEN_UUID: &str = "zzzzz-gj3su-000000000000001";
pub const TEST_TOKEN_SECRET: &str = "t0k3nsecretvalue0000000000000000000000000000000001";

// Users
pub const TEST_USER_ALICE: &str = "alice";
pub const TEST_USER_ALICE_PASSWORD: &str = "alice-password";
pub const TEST_USER_ALICE_EMAIL: &str = "alice@example.com";

// OIDC client
pub const TEST_OIDC_CLIENT_ID: &str = "login-test-client";
pub const TEST_OIDC_CLIENT_SECRET: &str = "test-secret-do-not-use-in-production";

/// Structured form of the minted credential: `v2/<uuid>/<secret>`.
pub fn test_token_v2() -> String {
    format!("v2/{}/{}", TEST_TOKEN_UUID, TEST_TOKEN_SECRET)
}
