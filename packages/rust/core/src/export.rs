//! Writing the final brochure to disk.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use brochurizer_shared::{BrochureError, Result};

pub const BROCHURE_PREFIX: &str = "brochure";
pub const BROCHURE_EXT: &str = "md";

/// Slug used when a title has no usable characters.
const EMPTY_SLUG: &str = "untitled";

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Filesystem-safe slug for a page title.
///
/// Accents are folded to their base letters, everything else outside
/// `[a-z0-9]` collapses to single hyphens, and edge hyphens are dropped.
pub fn slugify_title(title: &str) -> String {
    let folded: String = title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let slug = NON_ALNUM_RUN.replace_all(&folded, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// `brochure-<slug>.md`
pub fn brochure_file_name(title: &str) -> String {
    format!("{BROCHURE_PREFIX}-{}.{BROCHURE_EXT}", slugify_title(title))
}

/// Write `content` to `<output_dir>/brochure-<slug>.md`, creating the directory
/// if needed and replacing any earlier export for the same title.
#[instrument(skip(content), fields(output_dir = %output_dir.display(), bytes = content.len()))]
pub fn export_brochure(output_dir: &Path, title: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| BrochureError::io(output_dir, e))?;

    let path = output_dir.join(brochure_file_name(title));
    std::fs::write(&path, content).map_err(|e| BrochureError::io(&path, e))?;

    info!(path = %path.display(), "brochure exported");
    Ok(path)
}
