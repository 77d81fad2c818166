//! Brochure drafting and translation over streamed completions.
//!
//! Both steps share one pattern: build the request, open a delta stream, tee
//! each delta to the progress side channel and accumulate it in arrival order.

use futures::TryStreamExt;
use tracing::{info, instrument};

use brochurizer_llm::{ChatMessage, ChatRequest, DeltaStream, LanguageModelClient};
use brochurizer_shared::{Language, Result};

use crate::pipeline::ProgressReporter;

/// Accumulate a delta stream, handing every delta to `on_delta` as it arrives.
///
/// The first stream error aborts and is returned; an empty stream yields `""`.
pub async fn accumulate(stream: DeltaStream, on_delta: impl Fn(&str)) -> Result<String> {
    stream
        .inspect_ok(|delta| on_delta(delta))
        .try_fold(String::new(), |mut text, delta| async move {
            text.push_str(&delta);
            Ok(text)
        })
        .await
}

/// The first `max_chars` characters of `text` (char-boundary safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Drafting
// ---------------------------------------------------------------------------

/// Messages for the brochure-drafting request. `content` is capped at `max_chars`.
pub fn brochure_messages(title: &str, content: &str, max_chars: usize) -> Vec<ChatMessage> {
    let system = "You are an assistant that analyzes the contents of several webpages of a company \
                  and creates a short brochure about the company for prospective customers, \
                  investors and recruits, with all the relevant links. \
                  You should strictly respond in markdown format.";

    let user = format!(
        "You are looking at the webpage {title}.\n\n\
         Create a short brochure with all the relevant details using the contents below.\n\n\
         {}",
        truncate_chars(content, max_chars)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Stream a brochure draft from the aggregated content.
#[instrument(skip(llm, content, progress), fields(content_chars = content.chars().count()))]
pub async fn generate_brochure(
    llm: &dyn LanguageModelClient,
    model: &str,
    title: &str,
    content: &str,
    max_chars: usize,
    progress: &dyn ProgressReporter,
) -> Result<String> {
    let request = ChatRequest::new(model, brochure_messages(title, content, max_chars));

    progress.stream_started("Creating brochure");
    let stream = llm.stream(&request).await?;
    let draft = accumulate(stream, |delta| progress.delta(delta)).await?;
    progress.stream_finished();

    info!(draft_chars = draft.chars().count(), "brochure drafted");
    Ok(draft)
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

/// Messages for the translation request. The draft is sent in full.
pub fn translation_messages(draft: &str, language: &Language) -> Vec<ChatMessage> {
    let system = format!(
        "You are a translator assistant that analyzes the given text and translates it \
         into the {language} language. Keep the markdown formatting intact. \
         You should check whether the language given is valid; if the language is invalid, \
         return the original text unchanged."
    );

    let user = format!("Translate the contents below into the {language} language.\n\n{draft}");

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Stream a translation of `draft`. Whatever the model streams back is the result.
#[instrument(skip(llm, draft, progress), fields(language = %language))]
pub async fn translate_brochure(
    llm: &dyn LanguageModelClient,
    model: &str,
    draft: &str,
    language: &Language,
    progress: &dyn ProgressReporter,
) -> Result<String> {
    let request = ChatRequest::new(model, translation_messages(draft, language));

    progress.stream_started(&format!("Translating brochure into {language}"));
    let stream = llm.stream(&request).await?;
    let translated = accumulate(stream, |delta| progress.delta(delta)).await?;
    progress.stream_finished();

    info!(translated_chars = translated.chars().count(), "brochure translated");
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use brochurizer_llm::Role;
    use brochurizer_shared::BrochureError;
    use futures::StreamExt;

    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeLlm, RecordingProgress};

    fn stream_of(items: Vec<Result<String>>) -> DeltaStream {
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn accumulate_concatenates_and_tees() {
        let seen = Mutex::new(Vec::new());
        let stream = stream_of(vec![Ok("# Acme".into()), Ok(String::new()), Ok(" Inc".into())]);

        let text = accumulate(stream, |d| seen.lock().unwrap().push(d.to_string()))
            .await
            .unwrap();

        assert_eq!(text, "# Acme Inc");
        assert_eq!(*seen.lock().unwrap(), vec!["# Acme", "", " Inc"]);
    }

    #[tokio::test]
    async fn accumulate_is_independent_of_chunking() {
        let whole = "We build rockets and ship them.";
        let chunkings: [&[usize]; 3] = [&[31], &[1, 5, 25], &[10, 10, 10, 1]];

        for sizes in chunkings {
            let mut rest = whole;
            let mut items = Vec::new();
            for &n in sizes {
                let (head, tail) = rest.split_at(n);
                items.push(Ok(head.to_string()));
                rest = tail;
            }
            let text = accumulate(stream_of(items), |_| {}).await.unwrap();
            assert_eq!(text, whole);
        }
    }

    #[tokio::test]
    async fn accumulate_empty_stream_is_empty_text() {
        let text = accumulate(stream_of(vec![]), |_| {}).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn accumulate_stops_at_first_error() {
        let stream = stream_of(vec![
            Ok("partial".into()),
            Err(BrochureError::Llm("connection reset".into())),
            Ok("never".into()),
        ]);
        let err = accumulate(stream, |_| {}).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn brochure_request_caps_content() {
        let content = format!("{}{}", "a".repeat(20_000), "\u{2603}".repeat(50));
        let messages = brochure_messages("Acme", &content, 20_000);

        let user = &messages[1].content;
        assert!(user.starts_with("You are looking at the webpage Acme."));
        assert!(user.ends_with(&"a".repeat(20_000)));
        assert!(!user.contains('\u{2603}'));
        assert!(messages[0].content.contains("markdown"));
    }

    #[test]
    fn translation_request_keeps_full_draft() {
        let draft = "x".repeat(30_000);
        let language = Language::parse("french", &["french".to_string()]).unwrap();
        let messages = translation_messages(&draft, &language);

        assert!(messages[0].content.contains("return the original text"));
        assert!(messages[1].content.contains("french language"));
        assert!(messages[1].content.ends_with(&draft));
    }

    #[tokio::test]
    async fn generate_streams_and_reports_deltas() {
        let llm = FakeLlm::new("{}").with_stream(&["# Acme", "\n", "Rockets."]);
        let progress = RecordingProgress::default();

        let draft = generate_brochure(&llm, "m", "Acme", "seed text", 20_000, &progress)
            .await
            .unwrap();

        assert_eq!(draft, "# Acme\nRockets.");
        assert_eq!(progress.deltas(), "# Acme\nRockets.");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].stream);
        assert!(requests[0].content_of(Role::User).unwrap().ends_with("seed text"));
    }

    #[tokio::test]
    async fn generate_with_empty_stream_is_empty_draft() {
        let llm = FakeLlm::new("{}").with_stream(&[]);
        let draft = generate_brochure(&llm, "m", "Acme", "seed", 20_000, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(draft, "");
    }

    #[tokio::test]
    async fn translate_uses_model_output_as_is() {
        let llm = FakeLlm::new("{}").with_stream(&["# Acmé", " cohetes"]);
        let language = Language::parse("spanish", &["spanish".to_string()]).unwrap();

        let out = translate_brochure(&llm, "m", "# Acme rockets", &language, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(out, "# Acmé cohetes");
        let requests = llm.requests();
        assert!(requests[0].content_of(Role::User).unwrap().ends_with("# Acme rockets"));
    }
}
