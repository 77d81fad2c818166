//! Multi-page content aggregation with per-link skip on failure.

use std::collections::HashSet;

use tracing::{info, instrument, warn};
use url::Url;

use brochurizer_fetcher::PageFetcher;
use brochurizer_shared::{ClassifiedLink, Page};

use crate::pipeline::ProgressReporter;

/// A classified link whose content did not make it into the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub link: ClassifiedLink,
    pub reason: String,
}

/// Seed text plus one labeled section per successfully fetched link.
#[derive(Debug, Clone, Default)]
pub struct AggregatedContent {
    /// The concatenated text, uncapped.
    pub text: String,
    /// Links whose page text was appended, in order.
    pub included: Vec<ClassifiedLink>,
    /// Links left out: fetch failures, the seed itself, and repeats of
    /// an included or failed link.
    pub skipped: Vec<SkippedLink>,
}

/// Key used to detect the seed page and repeated links.
fn link_key(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim().trim_end_matches('/').to_string(),
    }
}

/// Build the aggregate from the already-fetched seed page and the classified links.
///
/// Every link is attempted at most once, in order. A failed fetch is reported
/// and skipped; no part of it reaches the aggregate. Links pointing at the seed
/// page, at an already-aggregated URL or at a URL that already failed are
/// skipped without fetching.
#[instrument(skip_all, fields(seed = %seed.url, links = links.len()))]
pub async fn aggregate(
    fetcher: &dyn PageFetcher,
    seed: &Page,
    links: &[ClassifiedLink],
    progress: &dyn ProgressReporter,
) -> AggregatedContent {
    let mut content = AggregatedContent {
        text: seed.text.clone(),
        ..Default::default()
    };

    // Keys of the seed and of every included page.
    let mut included = HashSet::from([link_key(&seed.url)]);
    let mut failed = HashSet::new();
    let total = links.len();

    for (i, link) in links.iter().enumerate() {
        let key = link_key(&link.url);

        let repeat = if included.contains(&key) {
            Some("already included")
        } else if failed.contains(&key) {
            Some("already attempted")
        } else {
            None
        };
        if let Some(reason) = repeat {
            info!(kind = %link.kind, url = %link.url, reason, "skipping repeated link");
            progress.link_skipped(link, reason);
            content.skipped.push(SkippedLink {
                link: link.clone(),
                reason: reason.to_string(),
            });
            continue;
        }

        progress.link_fetching(link, i + 1, total);

        match fetcher.fetch(&link.url).await {
            Ok(page) => {
                content.text.push_str("\n\n");
                content.text.push_str(&link.kind);
                content.text.push_str("\n\n");
                content.text.push_str(&page.text);
                content.included.push(link.clone());
                included.insert(key);
            }
            Err(e) => {
                warn!(kind = %link.kind, url = %link.url, error = %e, "could not fetch link contents");
                let reason = e.to_string();
                progress.link_skipped(link, &reason);
                content.skipped.push(SkippedLink {
                    link: link.clone(),
                    reason,
                });
                failed.insert(key);
            }
        }
    }

    info!(
        included = content.included.len(),
        skipped = content.skipped.len(),
        chars = content.text.chars().count(),
        "aggregation complete"
    );

    content
}
