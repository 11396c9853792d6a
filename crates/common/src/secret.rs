//! Secret types for values that must never reach logs.
//!
//! Re-exports the [`secrecy`] types used for the cluster's system root token,
//! identity provider client secrets, and user passwords. `SecretString`
//! implements `Debug` with redaction, so deriving `Debug` on a struct that
//! holds one is safe, and the value is zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct AuthenticateRequest {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let req = AuthenticateRequest {
//!     username: "active".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{req:?}").contains("hunter2"));
//! assert_eq!(req.password.expose_secret(), "hunter2");
//! ```
//!
//! Use `SecretString` for:
//! - The system root token used for root-scoped session-create calls
//! - OIDC/Google client secrets
//! - Passwords submitted to `UserAuthenticate`
//!
//! Issued API tokens are plain `String`s inside
//! [`crate::types::ApiClientAuthorization`] because they are returned to the
//! caller; that type redacts them in its own `Debug` impl instead.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
