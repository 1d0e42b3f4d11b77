use std::sync::Arc;

use studyflow_core::{ApiClient, Config};

pub mod config;
pub mod goal;
pub mod session;
pub mod stats;
pub mod timer;

/// Remote store client when an API base URL is configured. The bearer
/// credential comes from STUDYFLOW_TOKEN; its absence degrades to
/// unauthenticated requests.
pub(crate) fn api_client(config: &Config) -> Option<Arc<ApiClient>> {
    let base = config.sync.api_base_url.as_deref()?;
    match ApiClient::new(base, std::env::var("STUDYFLOW_TOKEN").ok()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("remote sync disabled: {e}");
            None
        }
    }
}
