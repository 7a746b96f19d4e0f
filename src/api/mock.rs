//! Scriptable in-process [`AudiobookBackend`] for unit tests.
//!
//! Every call answers from a responder closure (defaults describe a research
//! paper that converts cleanly) and is recorded by name.  A step can be
//! gated on a [`Notify`] so tests can hold a response in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::client::AudiobookBackend;
use crate::api::error::ApiError;
use crate::api::types::{
    AudioLocator, ClassificationResult, DailyUsage, Document, DocumentMetadata, SummaryResult,
    UsageSnapshot,
};

type Responder<T> = Box<dyn Fn() -> Result<T, ApiError> + Send + Sync>;

pub const MOCK_AUDIO_URL: &str = "http://backend.test/play_audio_book/";

pub fn rejected(message: &str) -> ApiError {
    ApiError::Rejected {
        status: 500,
        message: Some(message.to_string()),
    }
}

pub fn usage_snapshot(total: u64, limit: u64) -> UsageSnapshot {
    UsageSnapshot {
        today: DailyUsage {
            date_key: "2026-10-18".into(),
            input_tokens: total,
            output_tokens: 0,
            total_tokens: total,
        },
        daily_limit: limit,
        history: Vec::new(),
    }
}

pub struct MockBackend {
    upload: Responder<String>,
    info: Responder<DocumentMetadata>,
    classify: Responder<ClassificationResult>,
    summarize: Responder<SummaryResult>,
    synthesize: Responder<String>,
    audio: Responder<Vec<u8>>,
    usage: Responder<UsageSnapshot>,
    gates: HashMap<&'static str, Arc<Notify>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockBackend {
    /// Research paper, every step succeeds.
    pub fn happy() -> Self {
        Self {
            upload: Box::new(|| Ok("File uploaded successfully!".into())),
            info: Box::new(|| {
                Ok(DocumentMetadata {
                    size_mb: 1.5,
                    total_known_documents: 3,
                })
            }),
            classify: Box::new(|| {
                Ok(ClassificationResult {
                    is_research_paper: true,
                })
            }),
            summarize: Box::new(|| {
                Ok(SummaryResult {
                    text: "The paper shows that things work.".into(),
                    word_count: 842,
                    is_research_paper: true,
                })
            }),
            synthesize: Box::new(|| Ok("Audio book generated successfully!".into())),
            audio: Box::new(|| Ok(b"ID3".to_vec())),
            usage: Box::new(|| Ok(usage_snapshot(400, 1000))),
            gates: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_upload(
        mut self,
        f: impl Fn() -> Result<String, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.upload = Box::new(f);
        self
    }

    pub fn with_info(
        mut self,
        f: impl Fn() -> Result<DocumentMetadata, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.info = Box::new(f);
        self
    }

    pub fn with_classify(
        mut self,
        f: impl Fn() -> Result<ClassificationResult, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.classify = Box::new(f);
        self
    }

    pub fn with_summarize(
        mut self,
        f: impl Fn() -> Result<SummaryResult, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.summarize = Box::new(f);
        self
    }

    pub fn with_synthesize(
        mut self,
        f: impl Fn() -> Result<String, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.synthesize = Box::new(f);
        self
    }

    pub fn with_audio(
        mut self,
        f: impl Fn() -> Result<Vec<u8>, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.audio = Box::new(f);
        self
    }

    pub fn with_usage(
        mut self,
        f: impl Fn() -> Result<UsageSnapshot, ApiError> + Send + Sync + 'static,
    ) -> Self {
        self.usage = Box::new(f);
        self
    }

    /// Hold the named call until `gate` is notified.
    pub fn gated(mut self, call: &'static str, gate: Arc<Notify>) -> Self {
        self.gates.insert(call, gate);
        self
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = self.gates.get(call) {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl AudiobookBackend for MockBackend {
    async fn upload(&self, _document: &Document) -> Result<String, ApiError> {
        self.enter("upload").await;
        (self.upload)()
    }

    async fn document_info(&self) -> Result<DocumentMetadata, ApiError> {
        self.enter("info").await;
        (self.info)()
    }

    async fn classify(&self) -> Result<ClassificationResult, ApiError> {
        self.enter("classify").await;
        (self.classify)()
    }

    async fn summarize(&self) -> Result<SummaryResult, ApiError> {
        self.enter("summarize").await;
        (self.summarize)()
    }

    async fn synthesize(&self) -> Result<String, ApiError> {
        self.enter("synthesize").await;
        (self.synthesize)()
    }

    fn audio_locator(&self) -> AudioLocator {
        AudioLocator::new(MOCK_AUDIO_URL)
    }

    async fn fetch_audio(&self, _locator: &AudioLocator) -> Result<Vec<u8>, ApiError> {
        self.enter("fetch_audio").await;
        (self.audio)()
    }

    async fn download_audio(&self) -> Result<Vec<u8>, ApiError> {
        self.enter("download").await;
        (self.audio)()
    }

    async fn usage(&self) -> Result<UsageSnapshot, ApiError> {
        self.enter("usage").await;
        (self.usage)()
    }
}
