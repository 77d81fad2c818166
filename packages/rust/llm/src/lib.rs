//! Language model access for Brochurizer.
//!
//! This crate provides:
//! - [`LanguageModelClient`]: the model seam used by the brochure pipeline
//! - [`OpenAiCompatClient`]: an OpenAI-compatible chat-completions client
//! - [`decode_sse`]: server-sent events → [`DeltaStream`]

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;

use brochurizer_shared::Result;

pub use client::OpenAiCompatClient;
pub use sse::decode_sse;
pub use types::{ChatMessage, ChatRequest, Role};

/// Lazy, finite, non-restartable sequence of text deltas from a streamed completion.
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// A chat-completions backend.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Single, non-streamed completion. Returns the assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Streamed completion. Each item is one text delta, possibly empty.
    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream>;
}
