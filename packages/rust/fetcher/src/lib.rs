//! Web page fetching and extraction for Brochurizer.
//!
//! This crate provides:
//! - [`PageFetcher`]: the page-fetch seam used by the brochure pipeline
//! - [`HttpPageFetcher`]: `reqwest` + `scraper` implementation
//! - [`normalize_seed_url`] / [`check_reachable`]: seed URL helpers

pub mod extract;
pub mod fetcher;
pub mod seed;

pub use extract::{extract_links, extract_text, extract_title};
pub use fetcher::{HttpPageFetcher, PageFetcher, parse_page};
pub use seed::{check_reachable, normalize_seed_url};
