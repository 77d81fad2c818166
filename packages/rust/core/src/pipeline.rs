//! End-to-end `create` pipeline: seed page → link selection → aggregation →
//! draft → translation → export.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use brochurizer_fetcher::PageFetcher;
use brochurizer_llm::LanguageModelClient;
use brochurizer_shared::{ClassifiedLink, Language, Page, Result};

use crate::aggregate::{self, SkippedLink};
use crate::export;
use crate::generate;
use crate::links;

/// Collaborators and settings shared by every step of one run.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    pub fetcher: &'a dyn PageFetcher,
    pub llm: &'a dyn LanguageModelClient,
    /// Model identifier sent with every request.
    pub model: &'a str,
    /// Cap on the aggregated content handed to the drafting request.
    pub max_content_chars: usize,
    /// Languages accepted for translation (lowercase).
    pub supported_languages: &'a [String],
    /// Directory the brochure is exported into.
    pub output_dir: &'a std::path::Path,
}

/// Input for [`create_brochure`].
#[derive(Debug, Clone)]
pub struct BrochureRequest {
    /// The already-fetched seed page.
    pub seed: Page,
    /// Target language, if the brochure should be translated.
    pub language: Option<String>,
    /// Whether to write the result to disk.
    pub export: bool,
}

/// Result of [`create_brochure`].
#[derive(Debug)]
pub struct BrochureOutcome {
    /// Final brochure text (translated when a language was requested).
    pub content: String,
    /// Where the brochure was written, when export was requested.
    pub exported_to: Option<PathBuf>,
    /// Links the model classified, in response order.
    pub links: Vec<ClassifiedLink>,
    /// Classified links that contributed no content.
    pub skipped_links: Vec<SkippedLink>,
    pub translated_to: Option<Language>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the link selection has been parsed.
    fn links_selected(&self, links: &[ClassifiedLink]);
    /// Called before fetching a classified link.
    fn link_fetching(&self, link: &ClassifiedLink, current: usize, total: usize);
    /// Called when a classified link contributes nothing.
    fn link_skipped(&self, link: &ClassifiedLink, reason: &str);
    /// Called before a streamed model call starts producing deltas.
    fn stream_started(&self, label: &str);
    /// Called for every streamed delta, in arrival order.
    fn delta(&self, text: &str);
    /// Called after a stream has been fully consumed.
    fn stream_finished(&self);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &BrochureOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn links_selected(&self, _links: &[ClassifiedLink]) {}
    fn link_fetching(&self, _link: &ClassifiedLink, _current: usize, _total: usize) {}
    fn link_skipped(&self, _link: &ClassifiedLink, _reason: &str) {}
    fn stream_started(&self, _label: &str) {}
    fn delta(&self, _text: &str) {}
    fn stream_finished(&self) {}
    fn done(&self, _outcome: &BrochureOutcome) {}
}

/// Run the full `create` pipeline for an already-fetched seed page.
///
/// 1. Validate the requested language (before any model call)
/// 2. Select links (fatal on an unparseable response)
/// 3. Aggregate linked pages (per-link failures are skipped)
/// 4. Stream the draft
/// 5. Stream the translation, if a language was requested
/// 6. Export, if requested
///
/// Any error after step 3 aborts the run before anything is written.
#[instrument(skip_all, fields(url = %request.seed.url, title = %request.seed.title))]
pub async fn create_brochure(
    request: &BrochureRequest,
    ctx: PipelineContext<'_>,
    progress: &dyn ProgressReporter,
) -> Result<BrochureOutcome> {
    let start = Instant::now();
    let seed = &request.seed;

    info!(url = %seed.url, candidates = seed.links.len(), "starting create pipeline");

    let language = request
        .language
        .as_deref()
        .map(|l| Language::parse(l, ctx.supported_languages))
        .transpose()?;

    // --- Phase 1: Link selection ---
    progress.phase("Selecting relevant links");
    let selection =
        links::select_links(ctx.llm, ctx.model, &seed.title, &seed.url, &seed.links).await?;
    progress.links_selected(&selection.links);

    // --- Phase 2: Aggregation ---
    progress.phase("Fetching linked pages");
    let content = aggregate::aggregate(ctx.fetcher, seed, &selection.links, progress).await;

    // --- Phase 3: Draft ---
    progress.phase("Creating brochure");
    let draft = generate::generate_brochure(
        ctx.llm,
        ctx.model,
        &seed.title,
        &content.text,
        ctx.max_content_chars,
        progress,
    )
    .await?;

    // --- Phase 4: Translation ---
    let final_text = match &language {
        Some(language) => {
            progress.phase(&format!("Translating into {language}"));
            generate::translate_brochure(ctx.llm, ctx.model, &draft, language, progress).await?
        }
        None => draft,
    };

    // --- Phase 5: Export ---
    let exported_to = if request.export {
        progress.phase("Exporting brochure");
        Some(export::export_brochure(ctx.output_dir, &seed.title, &final_text)?)
    } else {
        None
    };

    let outcome = BrochureOutcome {
        content: final_text,
        exported_to,
        links: selection.links,
        skipped_links: content.skipped,
        translated_to: language,
        elapsed: start.elapsed(),
    };

    progress.done(&outcome);

    info!(
        links = outcome.links.len(),
        skipped = outcome.skipped_links.len(),
        chars = outcome.content.chars().count(),
        translated = outcome.translated_to.is_some(),
        exported = outcome.exported_to.is_some(),
        elapsed_ms = outcome.elapsed.as_millis(),
        "create pipeline complete"
    );

    Ok(outcome)
}
