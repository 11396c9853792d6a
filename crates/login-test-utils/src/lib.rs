//! # Login Test Utilities
//!
//! Shared test utilities for the login controller.
//!
//! This crate provides:
//! - Fixed test IDs and credentials
//! - Cluster configuration builder (TestClusterBuilder)
//! - A mock API server for the session-create and identity-proxy calls
//! - Server test harness (TestLoginServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use login_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let api = MockApiServer::start().await;
//!     api.mount_session_create(TEST_TOKEN_UUID, TEST_TOKEN_SECRET).await;
//!
//!     let cluster = TestClusterBuilder::new()
//!         .api_server_url(api.url())
//!         .with_test_user("alice", "hunter2", "alice@example.com")
//!         .build();
//! }
//! ```

pub mod cluster_builder;
pub mod mock_api_server;
pub mod server_harness;
pub mod test_ids;

// Re-export commonly used items
pub use cluster_builder::*;
pub use mock_api_server::*;
pub use server_harness::*;
pub use test_ids::*;
