//! In-memory collaborators for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;

use brochurizer_fetcher::PageFetcher;
use brochurizer_llm::{ChatRequest, DeltaStream, LanguageModelClient};
use brochurizer_shared::{BrochureError, ClassifiedLink, Page, Result};

use crate::pipeline::{BrochureOutcome, ProgressReporter};

pub fn page(url: &str, title: &str, text: &str) -> Page {
    Page {
        url: url.into(),
        title: title.into(),
        text: text.into(),
        links: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

struct ScriptedStream {
    chunks: Vec<String>,
    error: Option<String>,
}

/// Answers every completion with a fixed text and hands out scripted
/// streams in order. Records every request it receives.
pub struct FakeLlm {
    completion: String,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeLlm {
    pub fn new(completion: &str) -> Self {
        Self {
            completion: completion.into(),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a stream that yields `chunks` and then ends.
    pub fn with_stream(self, chunks: &[&str]) -> Self {
        self.push_stream(chunks, None)
    }

    /// Queue a stream that yields `chunks` and then fails with `message`.
    pub fn with_stream_error(self, chunks: &[&str], message: &str) -> Self {
        self.push_stream(chunks, Some(message.to_string()))
    }

    fn push_stream(self, chunks: &[&str], error: Option<String>) -> Self {
        self.streams.lock().unwrap().push_back(ScriptedStream {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            error,
        });
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelClient for FakeLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.completion.clone())
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        self.requests.lock().unwrap().push(ChatRequest {
            stream: true,
            ..request.clone()
        });

        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BrochureError::Llm("no scripted stream left".into()))?;

        let mut items: Vec<Result<String>> = script.chunks.into_iter().map(Ok).collect();
        if let Some(message) = script.error {
            items.push(Err(BrochureError::Llm(message)));
        }
        Ok(futures::stream::iter(items).boxed())
    }
}

// ---------------------------------------------------------------------------
// Page fetcher
// ---------------------------------------------------------------------------

/// Serves pages from memory; unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, std::result::Result<Page, String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.insert(page.url.clone(), Ok(page));
        self
    }

    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.pages.insert(url.to_string(), Err(message.to_string()));
        self
    }

    /// URLs requested so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(BrochureError::Network(message.clone())),
            None => Err(BrochureError::Network(format!("HTTP 404 for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingProgress {
    skipped: Mutex<Vec<String>>,
    deltas: Mutex<String>,
    done: AtomicBool,
}

impl RecordingProgress {
    pub fn skipped(&self) -> Vec<String> {
        self.skipped.lock().unwrap().clone()
    }

    /// Every delta seen so far, concatenated.
    pub fn deltas(&self) -> String {
        self.deltas.lock().unwrap().clone()
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for RecordingProgress {
    fn phase(&self, _name: &str) {}
    fn links_selected(&self, _links: &[ClassifiedLink]) {}
    fn link_fetching(&self, _link: &ClassifiedLink, _current: usize, _total: usize) {}

    fn link_skipped(&self, link: &ClassifiedLink, _reason: &str) {
        self.skipped.lock().unwrap().push(link.url.clone());
    }

    fn stream_started(&self, _label: &str) {}

    fn delta(&self, text: &str) {
        self.deltas.lock().unwrap().push_str(text);
    }

    fn stream_finished(&self) {}

    fn done(&self, _outcome: &BrochureOutcome) {
        self.done.store(true, Ordering::SeqCst);
    }
}
