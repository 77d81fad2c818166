//! Core pipeline orchestration and domain logic for Brochurizer.
//!
//! This crate ties together link selection, content aggregation, streamed
//! drafting and translation, and export into the end-to-end
//! [`create_brochure`] workflow.

pub mod aggregate;
pub mod export;
pub mod generate;
pub mod links;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use aggregate::{AggregatedContent, SkippedLink};
pub use export::{brochure_file_name, export_brochure, slugify_title};
pub use pipeline::{
    BrochureOutcome, BrochureRequest, PipelineContext, ProgressReporter, SilentProgress,
    create_brochure,
};
