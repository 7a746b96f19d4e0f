//! Core `AudiobookBackend` trait and its reqwest implementation.
//!
//! `HttpBackend` talks to the audiobook service.  All connection details come
//! from [`BackendConfig`]; nothing is hardcoded except the endpoint paths.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;
use crate::api::types::{
    AnalysisReply, AudioLocator, ClassificationResult, Document, DocumentMetadata, ErrorPayload,
    InfoReply, MessageReply, SummaryReply, SummaryResult, UsageReply, UsageSnapshot,
};
use crate::config::BackendConfig;

const UPLOAD_PATH: &str = "/uploadfile/";
const INFO_PATH: &str = "/read_pdf/";
const CLASSIFY_PATH: &str = "/analyze_pdf/";
const SUMMARIZE_PATH: &str = "/summarize_pdf/";
const SYNTHESIZE_PATH: &str = "/generate_audio_book/";
const PLAY_PATH: &str = "/play_audio_book/";
const DOWNLOAD_PATH: &str = "/download_audio_book/";
const USAGE_PATH: &str = "/token_usage/";

// ---------------------------------------------------------------------------
// AudiobookBackend trait
// ---------------------------------------------------------------------------

/// Every remote call the client makes.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// behind an `Arc<dyn AudiobookBackend>`.
#[async_trait]
pub trait AudiobookBackend: Send + Sync {
    /// Submit the PDF.  Returns the backend's confirmation message.
    async fn upload(&self, document: &Document) -> Result<String, ApiError>;

    async fn document_info(&self) -> Result<DocumentMetadata, ApiError>;

    async fn classify(&self) -> Result<ClassificationResult, ApiError>;

    async fn summarize(&self) -> Result<SummaryResult, ApiError>;

    /// Trigger text-to-speech.  Returns the backend's confirmation message.
    async fn synthesize(&self) -> Result<String, ApiError>;

    /// Where the synthesized audio can be streamed from.
    fn audio_locator(&self) -> AudioLocator;

    /// Raw bytes of the audio behind `locator`.
    async fn fetch_audio(&self, locator: &AudioLocator) -> Result<Vec<u8>, ApiError>;

    /// Raw bytes for saving the audiobook to disk.
    async fn download_audio(&self) -> Result<Vec<u8>, ApiError>;

    async fn usage(&self) -> Result<UsageSnapshot, ApiError>;
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build an `HttpBackend` from application config.
    ///
    /// A timeout is only applied when `config.timeout_secs` is set.  A default
    /// client is used as a last-resort fallback if the builder fails.
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|e| {
            log::warn!("http client builder failed ({e}); using defaults");
            reqwest::Client::new()
        });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let response = self.client.get(&url).send().await?;
        Self::json_or_rejection(response).await
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        log::debug!("GET {url} (binary)");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn json_or_rejection<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Turn a non-success response into [`ApiError::Rejected`], keeping the
    /// payload's `message` when the body is the usual JSON error shape.
    async fn rejection(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let message = response
            .bytes()
            .await
            .ok()
            .and_then(|body| serde_json::from_slice::<ErrorPayload>(&body).ok())
            .and_then(|payload| payload.message);
        ApiError::Rejected { status, message }
    }
}

#[async_trait]
impl AudiobookBackend for HttpBackend {
    async fn upload(&self, document: &Document) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.name.clone())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.url(UPLOAD_PATH);
        log::debug!("POST {url} ({} bytes)", document.bytes.len());
        let response = self.client.post(&url).multipart(form).send().await?;

        let reply: MessageReply = Self::json_or_rejection(response).await?;
        Ok(reply
            .message
            .unwrap_or_else(|| "File uploaded successfully!".into()))
    }

    async fn document_info(&self) -> Result<DocumentMetadata, ApiError> {
        let reply: InfoReply = self.get_json(INFO_PATH).await?;
        Ok(reply.into())
    }

    async fn classify(&self) -> Result<ClassificationResult, ApiError> {
        let reply: AnalysisReply = self.get_json(CLASSIFY_PATH).await?;
        Ok(ClassificationResult {
            is_research_paper: reply.is_research_paper,
        })
    }

    async fn summarize(&self) -> Result<SummaryResult, ApiError> {
        let reply: SummaryReply = self.get_json(SUMMARIZE_PATH).await?;
        Ok(reply.into())
    }

    async fn synthesize(&self) -> Result<String, ApiError> {
        let reply: MessageReply = self.get_json(SYNTHESIZE_PATH).await?;
        Ok(reply
            .message
            .unwrap_or_else(|| "Audio book generated successfully!".into()))
    }

    fn audio_locator(&self) -> AudioLocator {
        AudioLocator::new(self.url(PLAY_PATH))
    }

    async fn fetch_audio(&self, locator: &AudioLocator) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(locator.as_str()).await
    }

    async fn download_audio(&self) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&self.url(DOWNLOAD_PATH)).await
    }

    async fn usage(&self) -> Result<UsageSnapshot, ApiError> {
        let reply: UsageReply = self.get_json(USAGE_PATH).await?;
        Ok(reply.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(base_url: &str, timeout_secs: Option<u64>) -> BackendConfig {
        BackendConfig {
            base_url: base_url.into(),
            timeout_secs,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _backend = HttpBackend::from_config(&make_config("http://127.0.0.1:8000", None));
        let _backend = HttpBackend::from_config(&make_config("http://127.0.0.1:8000", Some(5)));
    }

    #[test]
    fn trailing_slash_is_normalised() {
        let backend = HttpBackend::from_config(&make_config("http://host:8000/", None));
        assert_eq!(backend.url(INFO_PATH), "http://host:8000/read_pdf/");
    }

    #[test]
    fn audio_locator_points_at_play_endpoint() {
        let backend = HttpBackend::from_config(&make_config("http://host:8000", None));
        assert_eq!(
            backend.audio_locator().as_str(),
            "http://host:8000/play_audio_book/"
        );
    }

    /// Verify that `HttpBackend` is object-safe (usable as `dyn AudiobookBackend`).
    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn AudiobookBackend> =
            Box::new(HttpBackend::from_config(&make_config("http://x", None)));
        drop(backend);
    }

    /// Nothing listens on port 9 locally; the failure must surface as a
    /// network error rather than a panic.
    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let backend = HttpBackend::from_config(&make_config("http://127.0.0.1:9", Some(2)));
        let err = backend.classify().await.expect_err("nothing listening");
        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    }
}
