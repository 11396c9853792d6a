//! Login Controller Library
//!
//! Authentication front-end of the cluster controller: picks exactly one
//! login backend from configuration, routes interactive login, logout and
//! username/password authentication to it, and mints API credentials through
//! the API server's session-create call.
//!
//! # Modules
//!
//! - `clients` - Remote collaborators (API server, OIDC provider, password verifier)
//! - `config` - Service configuration
//! - `context` - Request cancellation and transaction handle
//! - `controllers` - Backend selector and login backends
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP middleware
//! - `observability` - Metrics and log helpers
//! - `repositories` - Credential store
//! - `routes` - Router and application state
//! - `services` - Token minting and logout redirect resolution

pub mod clients;
pub mod config;
pub mod context;
pub mod controllers;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
