//! Shared types, error model, and configuration for Brochurizer.
//!
//! This crate is the foundation depended on by all other Brochurizer crates.
//! It provides:
//! - [`BrochureError`]: the unified error type
//! - Domain types ([`Page`], [`ClassifiedLink`], [`LinkSelection`], [`Language`])
//! - Configuration ([`AppConfig`], [`LlmSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BASE_URL_ENV, BrochureConfig, FetchConfig, LlmConfig, LlmSettings, MODEL_ENV,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{BrochureError, Result};
pub use types::{ClassifiedLink, Language, LinkSelection, Page};
