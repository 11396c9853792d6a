//! Backend-independent login operations.
//!
//! - [`token_minting`] turns a root-scoped session-create call into a stored
//!   API credential.
//! - [`logout`] resolves the post-logout redirect target.

pub mod logout;
pub mod token_minting;

pub use logout::noop_logout;
pub use token_minting::{create_api_client_authorization, extract_token_secret};
