//! Page fetching over HTTP.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use brochurizer_shared::{BrochureError, FetchConfig, Page, Result};

use crate::extract::{extract_links, extract_text, extract_title};

/// User-Agent string for page requests.
pub(crate) const USER_AGENT: &str = concat!("Brochurizer/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Fetches a URL and reduces it to a [`Page`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`. Any failure (validation, network, status) is an error.
    async fn fetch(&self, url: &str) -> Result<Page>;
}

// ---------------------------------------------------------------------------
// HttpPageFetcher
// ---------------------------------------------------------------------------

/// [`PageFetcher`] backed by `reqwest` and `scraper`.
pub struct HttpPageFetcher {
    client: Client,
    /// Allow loopback hosts (for integration tests with mock servers).
    allow_loopback: bool,
}

impl HttpPageFetcher {
    /// Create a fetcher using the `[fetch]` settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::build(config, false)
    }

    /// Fetcher that may reach loopback hosts (for integration tests).
    #[cfg(test)]
    pub(crate) fn allowing_loopback(config: &FetchConfig) -> Result<Self> {
        Self::build(config, true)
    }

    fn build(config: &FetchConfig, allow_loopback: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy(config.max_redirects, allow_loopback))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrochureError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_loopback,
        })
    }

    /// Parse and vet a URL before any request goes out.
    fn validate(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim())
            .map_err(|e| BrochureError::validation(format!("invalid URL '{raw}': {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(BrochureError::validation(format!(
                    "unsupported URL scheme '{other}' in {url}"
                )));
            }
        }

        if url.host_str().is_none() {
            return Err(BrochureError::validation(format!("URL has no host: {url}")));
        }

        if is_blocked(&url, self.allow_loopback) {
            return Err(BrochureError::validation(format!(
                "refusing to fetch private or local address: {url}"
            )));
        }

        Ok(url)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Page> {
        let url = self.validate(url)?;
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| request_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrochureError::Network(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| BrochureError::Network(format!("{url}: body read failed: {e}")))?;

        let page = parse_page(&final_url, &body);
        debug!(
            url = %page.url,
            title = %page.title,
            text_len = page.text.len(),
            links = page.links.len(),
            "page fetched"
        );

        Ok(page)
    }
}

/// Build a [`Page`] from an HTML document fetched from `url`.
pub fn parse_page(url: &Url, html: &str) -> Page {
    let doc = Html::parse_document(html);
    Page {
        url: url.to_string(),
        title: extract_title(&doc),
        text: extract_text(&doc),
        links: extract_links(&doc, url),
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Whether a request to `url` must be refused.
fn is_blocked(url: &Url, allow_loopback: bool) -> bool {
    if allow_loopback && is_loopback(url) {
        return false;
    }
    is_ssrf_target(url)
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => v4.is_loopback(),
        Some(url::Host::Ipv6(v6)) => v6.is_loopback(),
        Some(url::Host::Domain(host)) => host == "localhost",
        None => false,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d reaches the IPv4 host
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10 (link-local)
                || (first & 0xffc0) == 0xfe80
                // fc00::/7 (unique local)
                || (first & 0xfe00) == 0xfc00
        }
    }
}

/// Follow at most `max_redirects` hops, never into a blocked host.
fn redirect_policy(max_redirects: usize, allow_loopback: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            let message = format!("too many redirects (limit {max_redirects})");
            attempt.error(message)
        } else if is_blocked(attempt.url(), allow_loopback) {
            let message = format!("redirect to private or local address: {}", attempt.url());
            attempt.error(message)
        } else {
            attempt.follow()
        }
    })
}

/// Map a send failure, keeping the policy's reason for refused redirects.
fn request_error(url: &Url, e: &reqwest::Error) -> BrochureError {
    match std::error::Error::source(e) {
        Some(reason) if e.is_redirect() => {
            BrochureError::Network(format!("{url}: redirect refused: {reason}"))
        }
        _ => BrochureError::Network(format!("{url}: {e}")),
    }
}
