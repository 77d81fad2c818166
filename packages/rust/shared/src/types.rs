//! Core domain types for brochure creation.

use serde::{Deserialize, Serialize};

use crate::error::{BrochureError, Result};

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A fetched web page reduced to what the brochure pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Final URL the page was fetched from.
    pub url: String,
    /// Page title (`<title>`, falling back to the first H1). May be empty.
    pub title: String,
    /// Visible text of the page body.
    pub text: String,
    /// Absolute candidate links, in document order.
    pub links: Vec<String>,
}

// ---------------------------------------------------------------------------
// Link selection
// ---------------------------------------------------------------------------

/// A link the model judged relevant for the brochure, tagged with a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLink {
    /// Semantic type, e.g. `about_page` or `careers_page`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Absolute URL as returned by the model.
    pub url: String,
}

/// Parsed link-selection response: `{"links": [{"type": ..., "url": ...}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSelection {
    /// Classified links in response order.
    pub links: Vec<ClassifiedLink>,
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// A translation target checked against the configured language list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Language(String);

impl Language {
    /// Validate `input` against `supported` (case-insensitive, trimmed).
    pub fn parse(input: &str, supported: &[String]) -> Result<Self> {
        let name = input.trim().to_lowercase();
        if name.is_empty() {
            return Err(BrochureError::validation("translation language is empty"));
        }
        if !supported.iter().any(|s| s.eq_ignore_ascii_case(&name)) {
            return Err(BrochureError::validation(format!(
                "translation language '{name}' is not supported (supported: {})",
                supported.join(", ")
            )));
        }
        Ok(Self(name))
    }

    /// The normalized language name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
