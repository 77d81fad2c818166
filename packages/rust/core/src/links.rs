//! Link selection: ask the model which discovered links belong in the brochure.

use tracing::{debug, info, instrument};

use brochurizer_llm::{ChatMessage, ChatRequest, LanguageModelClient};
use brochurizer_shared::{BrochureError, LinkSelection, Result};

/// Example response shown to the model.
const LINKS_EXAMPLE: &str = r#"{
    "links": [
        {"type": "about_page", "url": "https://example.com/about"},
        {"type": "careers_page", "url": "https://example.com/careers"}
    ]
}"#;

/// Messages for the link-classification request.
pub fn link_selection_messages(title: &str, url: &str, links: &[String]) -> Vec<ChatMessage> {
    let system = format!(
        "You are provided with a list of links found on a webpage. \
         Decide which of those links are relevant to include in a brochure about the company. \
         Respond in JSON format exactly as in the example below. \
         The response must strictly be JSON: it must start and end with a curly brace. \
         Do not add anything before or after the curly braces. \
         Replace the example domain name with the actual domain name. \
         Make sure that the type and url properties are included in every entry.\n\n\
         {LINKS_EXAMPLE}"
    );

    let user = format!(
        "You are looking at the webpage {title} with the url {url}. \
         Decide on the relevant links for the brochure. Respond with full https urls. \
         Do not include terms of service, terms and conditions or privacy policy links.\n\n\
         Below is the list of links:\n{}",
        links.join("\n")
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Parse the model's link-selection response.
///
/// The response must be a single JSON object (surrounding whitespace is
/// tolerated) with a `links` array whose entries all carry non-empty string
/// `type` and `url` fields. Anything else is a [`BrochureError::LinkParse`].
pub fn parse_link_selection(raw: &str) -> Result<LinkSelection> {
    let trimmed = raw.trim();

    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(BrochureError::link_parse(format!(
            "response must start and end with a curly brace (got: {})",
            preview(trimmed)
        )));
    }

    let selection: LinkSelection =
        serde_json::from_str(trimmed).map_err(|e| BrochureError::link_parse(e.to_string()))?;

    if let Some((i, _)) = selection
        .links
        .iter()
        .enumerate()
        .find(|(_, l)| l.kind.trim().is_empty() || l.url.trim().is_empty())
    {
        return Err(BrochureError::link_parse(format!(
            "link #{i} has an empty type or url"
        )));
    }

    Ok(selection)
}

/// Ask the model to classify `links` from the seed page and parse its answer.
#[instrument(skip(llm, links), fields(candidates = links.len()))]
pub async fn select_links(
    llm: &dyn LanguageModelClient,
    model: &str,
    title: &str,
    url: &str,
    links: &[String],
) -> Result<LinkSelection> {
    let request = ChatRequest::new(model, link_selection_messages(title, url, links));
    let raw = llm.complete(&request).await?;
    debug!(response = %preview(&raw), "link selection response received");

    let selection = parse_link_selection(&raw)?;
    info!(selected = selection.links.len(), "parsed links as JSON");
    Ok(selection)
}

fn preview(s: &str) -> String {
    const MAX: usize = 120;
    if s.chars().count() > MAX {
        format!("{}...", s.chars().take(MAX).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;
    use brochurizer_llm::Role;

    #[test]
    fn messages_embed_page_and_links() {
        let links = vec![
            "https://x.com/about".to_string(),
            "https://x.com/terms".to_string(),
        ];
        let messages = link_selection_messages("Acme", "https://x.com", &links);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("start and end with a curly brace"));
        assert!(messages[0].content.contains(r#""type": "about_page""#));

        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("webpage Acme with the url https://x.com"));
        assert!(messages[1].content.contains("privacy policy"));
        assert!(messages[1].content.contains("https://x.com/about\nhttps://x.com/terms"));
    }

    #[test]
    fn parse_preserves_count_and_order() {
        let raw = r#"
        {"links": [
            {"type": "about_page", "url": "https://x.com/about"},
            {"type": "careers_page", "url": "https://x.com/careers"},
            {"type": "about_page", "url": "https://x.com/about"}
        ]}
        "#;
        let selection = parse_link_selection(raw).unwrap();

        let urls: Vec<&str> = selection.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://x.com/about", "https://x.com/careers", "https://x.com/about"]
        );
        assert_eq!(selection.links[1].kind, "careers_page");
    }

    #[test]
    fn parse_accepts_empty_list() {
        let selection = parse_link_selection(r#"{"links": []}"#).unwrap();
        assert!(selection.links.is_empty());
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_link_selection("not json").unwrap_err();
        assert!(matches!(err, BrochureError::LinkParse { .. }));
    }

    #[test]
    fn parse_rejects_text_outside_braces() {
        for raw in [
            "Here you go: {\"links\": []}",
            "{\"links\": []} hope this helps",
            "```json\n{\"links\": []}\n```",
        ] {
            let err = parse_link_selection(raw).unwrap_err();
            assert!(matches!(err, BrochureError::LinkParse { .. }), "{raw}");
        }
    }

    #[test]
    fn parse_rejects_invalid_json_between_braces() {
        let err = parse_link_selection("{links: [}").unwrap_err();
        assert!(matches!(err, BrochureError::LinkParse { .. }));
    }

    #[test]
    fn parse_rejects_missing_fields() {
        for raw in [
            r#"{"links": [{"type": "about_page"}]}"#,
            r#"{"links": [{"url": "https://x.com/about"}]}"#,
            r#"{"links": [{"type": "about_page", "url": 42}]}"#,
            r#"{"links": [{"type": " ", "url": "https://x.com/about"}]}"#,
            r#"{"links": [{"type": "about_page", "url": ""}]}"#,
            r#"{"pages": []}"#,
        ] {
            let err = parse_link_selection(raw).unwrap_err();
            assert!(matches!(err, BrochureError::LinkParse { .. }), "{raw}");
        }
    }

    #[tokio::test]
    async fn select_links_sends_one_completion() {
        let llm = FakeLlm::new(r#"{"links": [{"type": "about_page", "url": "https://x.com/about"}]}"#);

        let selection = select_links(
            &llm,
            "test-model",
            "Acme",
            "https://x.com",
            &["https://x.com/about".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(selection.links.len(), 1);
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert!(!requests[0].stream);
    }
}
