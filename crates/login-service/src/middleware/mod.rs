//! HTTP middleware for the login controller.

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
