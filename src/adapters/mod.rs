// Adapters layer: reqwest-backed implementations of the domain ports.

pub mod bucket;
pub mod pod_api;

pub use bucket::BucketClient;
pub use pod_api::PodApiClient;

use crate::utils::error::{BulkError, Result};
use std::time::Duration;
use url::Url;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("pod-bulk/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Appends `segments` to the base URL's path; each segment is percent-encoded,
/// so ids containing `/` or `?` stay a single segment.
pub(crate) fn endpoint_url(base: &str, segments: &[&str]) -> Result<String> {
    let invalid = |reason: &str| BulkError::InvalidConfigValueError {
        field: "api_endpoint".to_string(),
        value: base.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(base).map_err(|e| invalid(&e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}
