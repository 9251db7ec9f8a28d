//! Shared request plumbing for the REST adapters

use crate::error::{ProviderError, ProviderResult};
use backon::{ExponentialBuilder, Retryable};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn default_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(1))
        .with_max_times(2)
}

pub(crate) fn build_client() -> ProviderResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Parse a base URL so that `join` appends to its path instead of replacing it
pub(crate) fn parse_base_url(raw: &str) -> ProviderResult<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Send a request (rebuilt per attempt), retrying transient failures, and decode JSON
pub(crate) async fn send_json<T, F>(
    operation: &'static str,
    backoff: &ExponentialBuilder,
    build: F,
) -> ProviderResult<T>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let attempt = || async {
        let response = check_status(build().send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str::<T>(&body)
            .map_err(|e| ProviderError::Malformed(format!("{}: {}", operation, e)))
    };

    attempt
        .retry(backoff.clone())
        .when(ProviderError::is_transient)
        .notify(|err: &ProviderError, dur: Duration| {
            warn!(
                operation = operation,
                error = %err,
                retry_in_ms = dur.as_millis() as u64,
                "{} failed, retrying",
                operation
            );
        })
        .await
}

async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}
