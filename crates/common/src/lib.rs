//! Common types shared between the login controller and its callers.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for request and response value types
pub mod types;
