//! Seed URL normalization and reachability checks.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;

use brochurizer_shared::{BrochureError, Result};

use crate::fetcher::USER_AGENT;

/// Normalize user input into an absolute http(s) URL.
///
/// Input without a scheme is assumed to be `https://`.
pub fn normalize_seed_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BrochureError::validation("URL is empty"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| BrochureError::validation(format!("invalid URL '{trimmed}': {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(BrochureError::validation(format!(
            "unsupported URL scheme '{}': expected http or https",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(BrochureError::validation(format!("URL has no host: {url}"))),
    }
}

/// Check that `url` answers with a success (or redirect) status within `timeout`.
///
/// Tries `HEAD` first and falls back to `GET` for servers that reject it.
#[instrument(skip_all, fields(url = %url))]
pub async fn check_reachable(url: &Url, timeout: Duration) -> Result<()> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| BrochureError::Network(format!("failed to build HTTP client: {e}")))?;

    let send = |method: reqwest::Method| {
        let client = client.clone();
        let url = url.clone();
        async move {
            client
                .request(method, url.as_str())
                .send()
                .await
                .map_err(|e| BrochureError::Network(format!("{url} is not reachable: {e}")))
        }
    };

    let mut status = send(reqwest::Method::HEAD).await?.status();
    if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
        debug!(%status, "HEAD rejected, retrying with GET");
        status = send(reqwest::Method::GET).await?.status();
    }

    if status.is_success() || status.is_redirection() {
        info!(%status, "seed URL reachable");
        Ok(())
    } else {
        Err(BrochureError::Network(format!(
            "{url} is not reachable: HTTP {status}"
        )))
    }
}
