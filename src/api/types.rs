//! Domain values exchanged with the audiobook backend, plus the raw wire
//! payloads they are parsed from.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Errors raised while turning a local file into an uploadable [`Document`].
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("only PDF files can be converted (got {0})")]
    NotPdf(String),

    #[error("path has no file name")]
    NoFileName,

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// A PDF ready to be uploaded: its display name and contents.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a `.pdf` file from disk.
    ///
    /// The extension check is case-insensitive; anything else is rejected
    /// before touching the network.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(DocumentError::NoFileName)?
            .to_string();

        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(DocumentError::NotPdf(name));
        }

        let bytes = std::fs::read(path)?;
        Ok(Self { name, bytes })
    }

    pub fn handle(&self) -> DocumentHandle {
        DocumentHandle {
            name: self.name.clone(),
            size_bytes: self.bytes.len() as u64,
        }
    }
}

/// What the client remembers about the uploaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHandle {
    pub name: String,
    pub size_bytes: u64,
}

impl DocumentHandle {
    /// Size in mebibytes, as shown next to the file name.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

// ---------------------------------------------------------------------------
// Stage results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub size_mb: f64,
    pub total_known_documents: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub is_research_paper: bool,
}

/// Number of characters shown in the collapsed summary view.
pub const SUMMARY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub text: String,
    pub word_count: u64,
    pub is_research_paper: bool,
}

impl SummaryResult {
    /// The collapsed view: the first 500 characters, with `...` appended
    /// when anything was cut.
    ///
    /// ```
    /// use pdf_audiobook::api::SummaryResult;
    ///
    /// let short = SummaryResult { text: "Short.".into(), word_count: 1, is_research_paper: true };
    /// assert_eq!(short.preview(), "Short.");
    ///
    /// let long = SummaryResult { text: "a".repeat(501), word_count: 1, is_research_paper: true };
    /// assert_eq!(long.preview().len(), 503);
    /// assert!(long.preview().ends_with("a..."));
    /// ```
    pub fn preview(&self) -> String {
        match self.text.char_indices().nth(SUMMARY_PREVIEW_CHARS) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }

    /// Full text when `expanded`, otherwise [`preview`](Self::preview).
    pub fn display(&self, expanded: bool) -> String {
        if expanded {
            self.text.clone()
        } else {
            self.preview()
        }
    }

    pub fn document_type_label(&self) -> &'static str {
        if self.is_research_paper {
            "Research Paper"
        } else {
            "General Document"
        }
    }
}

/// Opaque reference to the synthesized audio, usable by the playback
/// transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioLocator(String);

impl AudioLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AudioLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Token consumption for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUsage {
    /// `YYYY-MM-DD` as reported by the backend.
    pub date_key: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// One read of the backend's usage telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub today: DailyUsage,
    pub daily_limit: u64,
    /// Prior days, most recent first.
    pub history: Vec<DailyUsage>,
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageReply {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InfoReply {
    pub file_size_mb: f64,
    pub total_pdf_files: u64,
}

impl From<InfoReply> for DocumentMetadata {
    fn from(r: InfoReply) -> Self {
        Self {
            size_mb: r.file_size_mb,
            total_known_documents: r.total_pdf_files,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalysisReply {
    pub is_research_paper: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryDetails {
    pub word_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryReply {
    pub summary: String,
    #[serde(default)]
    pub summary_details: Option<SummaryDetails>,
    #[serde(default)]
    pub is_research_paper: bool,
}

impl From<SummaryReply> for SummaryResult {
    fn from(r: SummaryReply) -> Self {
        let word_count = r
            .summary_details
            .map(|d| d.word_count)
            .unwrap_or_else(|| r.summary.split_whitespace().count() as u64);
        Self {
            text: r.summary,
            word_count,
            is_research_paper: r.is_research_paper,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DayReply {
    pub date: String,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl From<DayReply> for DailyUsage {
    fn from(r: DayReply) -> Self {
        Self {
            date_key: r.date,
            input_tokens: r.input_tokens,
            output_tokens: r.output_tokens,
            total_tokens: r.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsageReply {
    pub today: DayReply,
    pub daily_limit: u64,
    #[serde(default)]
    pub history: Vec<DayReply>,
}

impl From<UsageReply> for UsageSnapshot {
    fn from(r: UsageReply) -> Self {
        Self {
            today: r.today.into(),
            daily_limit: r.daily_limit,
            history: r.history.into_iter().map(DailyUsage::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
