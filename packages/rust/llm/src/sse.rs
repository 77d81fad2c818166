//! Server-sent events decoding for streamed chat completions.
//!
//! Turns a raw byte stream into a [`DeltaStream`] of text fragments. Events may
//! be split across network chunks; only complete lines are interpreted.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::trace;

use brochurizer_shared::BrochureError;

use crate::DeltaStream;
use crate::types::StreamChunk;

/// Sentinel payload closing an OpenAI-style stream.
const DONE_SENTINEL: &str = "[DONE]";

struct SseState<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    error: Option<BrochureError>,
    finished: bool,
}

impl<S> SseState<S> {
    /// Interpret every complete line currently buffered.
    fn drain_lines(&mut self) {
        while !self.finished && self.error.is_none() {
            let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&line[..line.len() - 1]);
        }
    }

    fn handle_line(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(e) => {
                self.error = Some(BrochureError::Llm(format!("stream is not UTF-8: {e}")));
                return;
            }
        };

        // Comments, `event:`/`id:` fields and blank separators carry no text.
        let Some(payload) = line.strip_prefix("data:") else {
            return;
        };
        let payload = payload.trim();

        if payload == DONE_SENTINEL {
            trace!("stream finished");
            self.finished = true;
            return;
        }

        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => match chunk.error {
                Some(err) => {
                    self.error = Some(BrochureError::Llm(format!("stream error event: {err}")));
                }
                None => self.pending.push_back(chunk.into_delta()),
            },
            Err(e) => {
                self.error = Some(BrochureError::Llm(format!(
                    "malformed stream chunk: {e} (got: {})",
                    payload.chars().take(200).collect::<String>()
                )));
            }
        }
    }
}

/// Decode an SSE byte stream into text deltas.
///
/// Deltas are yielded in arrival order, including empty ones. The stream ends at
/// `data: [DONE]` or when the body closes; the first decoding or transport error
/// is yielded after any deltas that preceded it, and ends the stream.
pub fn decode_sse<S, B, E>(body: S) -> DeltaStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        error: None,
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(delta) = st.pending.pop_front() {
                return Some((Ok(delta), st));
            }
            if let Some(err) = st.error.take() {
                st.finished = true;
                return Some((Err(err), st));
            }
            if st.finished {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    st.buffer.extend_from_slice(chunk.as_ref());
                    st.drain_lines();
                }
                Some(Err(e)) => {
                    st.error = Some(BrochureError::Llm(format!("stream read failed: {e}")));
                }
                None => {
                    let rest = std::mem::take(&mut st.buffer);
                    if !rest.is_empty() {
                        st.handle_line(&rest);
                    }
                    st.finished = true;
                }
            }
        }
    })
    .boxed()
}

/// Collect a delta stream into a single string (no side channel).
#[cfg(test)]
pub(crate) async fn collect_text(mut stream: DeltaStream) -> brochurizer_shared::Result<String> {
    let mut text = String::new();
    while let Some(delta) = stream.next().await {
        text.push_str(&delta?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brochurizer_shared::Result;

    fn body(chunks: &[&str]) -> impl Stream<Item = std::result::Result<Vec<u8>, String>> + use<> {
        let owned: Vec<std::result::Result<Vec<u8>, String>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        futures::stream::iter(owned)
    }

    async fn deltas(stream: DeltaStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn decodes_deltas_in_order() {
        let stream = decode_sse(body(&[
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"# Acme\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" rocks\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]));

        let out: Vec<String> = deltas(stream).await.into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(out, vec!["", "# Acme", " rocks"]);
    }

    #[tokio::test]
    async fn reassembles_events_split_across_chunks() {
        let stream = decode_sse(body(&[
            "data: {\"choices\":[{\"del",
            "ta\":{\"content\":\"Caf\u{e9}\"}}]}\r\n\r\nda",
            "ta: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n\n",
        ]));

        let text = collect_text(stream).await.unwrap();
        assert_eq!(text, "Caf\u{e9}!");
    }

    #[tokio::test]
    async fn ignores_comments_and_stops_at_done() {
        let stream = decode_sse(body(&[
            ": keep-alive\n",
            "event: message\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]));

        assert_eq!(collect_text(stream).await.unwrap(), "a");
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        let stream = decode_sse(body(&[]));
        assert!(deltas(stream).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_chunk_errors_after_prior_deltas() {
        let stream = decode_sse(body(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
            "data: {not json}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n",
        ]));

        let out = deltas(stream).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "ok");
        assert!(matches!(out[1], Err(BrochureError::Llm(_))));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let out = deltas(decode_sse(futures::stream::iter(chunks))).await;
        assert_eq!(out.len(), 2);
        assert!(out[1].as_ref().unwrap_err().to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn error_event_is_reported() {
        let stream = decode_sse(body(&["data: {\"error\":{\"message\":\"rate limited\"}}\n"]));
        let err = collect_text(stream).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
