use crate::config::ClusterConfig;
use common::types::{LogoutOptions, LogoutResponse};

/// Resolve where to send a user after logout without contacting anyone.
///
/// Precedence: the caller's `return_to`, then the primary web client if it
/// has a host, then the legacy web client (empty when unset). Never fails.
pub fn noop_logout(cluster: &ClusterConfig, opts: &LogoutOptions) -> LogoutResponse {
    let redirect_location = if !opts.return_to.is_empty() {
        opts.return_to.clone()
    } else {
        match &cluster.services.workbench2_url {
            Some(url) if url.host_str().is_some_and(|host| !host.is_empty()) => url.to_string(),
            _ => cluster
                .services
                .workbench1_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    };

    LogoutResponse { redirect_location }
}
