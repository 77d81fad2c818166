//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use brochurizer_shared::{BrochureError, LlmSettings, Result};

use crate::sse::decode_sse;
use crate::types::{ChatRequest, ChatResponse};
use crate::{DeltaStream, LanguageModelClient};

/// Client for any endpoint speaking the `/chat/completions` protocol
/// (OpenAI, OpenRouter, Ollama, vLLM, ...).
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatClient {
    /// Build a client from resolved settings.
    ///
    /// No timeout is applied unless `settings.timeout` is set.
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| BrochureError::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| BrochureError::config(format!("API key is not a valid header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// POST the request and fail on any non-success status.
    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| BrochureError::Llm(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BrochureError::Llm(format!(
                "API error ({status}): {}",
                error_text.chars().take(500).collect::<String>()
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LanguageModelClient for OpenAiCompatClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let request = ChatRequest {
            stream: false,
            ..request.clone()
        };
        debug!("chat completion request");

        let response: ChatResponse = self
            .post(&request)
            .await?
            .json()
            .await
            .map_err(|e| BrochureError::Llm(format!("invalid completion response: {e}")))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(response_len = text.len(), "chat completion received");
        Ok(text)
    }

    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        let request = ChatRequest {
            stream: true,
            ..request.clone()
        };
        debug!("streaming chat completion request");

        let response = self.post(&request).await?;
        Ok(decode_sse(response.bytes_stream()))
    }
}
