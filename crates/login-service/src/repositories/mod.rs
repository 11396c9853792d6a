//! Database access layer.

pub mod api_client_authorizations;
pub mod lazy_transaction;
