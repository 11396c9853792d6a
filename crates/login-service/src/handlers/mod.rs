//! HTTP handlers.

pub mod health;
pub mod login;
pub mod metrics;

pub use health::{health_check, readiness_check};
pub use login::{login, logout, user_authenticate};
pub use self::metrics::metrics_handler;
