//! HTML → title / visible text / links extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Node, Selector};
use url::Url;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Elements whose text never counts as visible page text.
const IRRELEVANT_TAGS: &[&str] = &[
    "script", "style", "img", "input", "noscript", "svg", "template", "head",
];

/// Page title from `<title>`, falling back to the first `<h1>`. Empty if neither exists.
pub fn extract_title(doc: &Html) -> String {
    let from = |sel: &Selector| {
        doc.select(sel)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    };

    from(&TITLE).or_else(|| from(&H1)).unwrap_or_default()
}

/// Visible body text, one line per text block.
pub fn extract_text(doc: &Html) -> String {
    let Some(body) = doc.select(&BODY).next() else {
        return String::new();
    };

    let mut lines = Vec::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| IRRELEVANT_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Extract all links from a document, resolved against the base URL.
///
/// Anchors, `javascript:`, `mailto:` and `tel:` links are dropped, fragments are
/// stripped and duplicates removed while keeping document order.
pub fn extract_links(doc: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&LINKS) {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        if let Ok(mut resolved) = base_url.join(href) {
            resolved.set_fragment(None);
            let link = resolved.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
