//! Pipeline orchestrator module for the PDF-to-audiobook client.
//!
//! This module drives a document through the backend (upload → document info
//! → classification → summary → speech synthesis) and exposes the run's state
//! to the UI.
//!
//! # Architecture
//!
//! ```text
//! AudiobookApp (egui)
//!        │ start / continue_after_classification / reset / download_audio
//!        ▼
//! PipelineOrchestrator  ── tokio task per run, walks the stage table
//!        │
//!        ├─ watch<PipelineSnapshot>  ←── read by egui update() each frame
//!        ├─ watch<u64> usage epoch   ←── UsageMonitor refreshes on change
//!        └─ SharedNotifier           ←── status banner
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pdf_audiobook::api::{Document, HttpBackend};
//! use pdf_audiobook::config::AppConfig;
//! use pdf_audiobook::pipeline::{PipelineOrchestrator, Stage};
//! use pdf_audiobook::status::new_shared_notifier;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let orchestrator = PipelineOrchestrator::new(
//!         Arc::new(HttpBackend::from_config(&config.backend)),
//!         &config.pipeline,
//!         new_shared_notifier(),
//!         tokio::runtime::Handle::current(),
//!     );
//!
//!     let document = Document::from_path("paper.pdf".as_ref())?;
//!     orchestrator.start(document)?.await?;
//!
//!     let snapshot = orchestrator.snapshot();
//!     if snapshot.stage == Stage::AudioReady {
//!         println!("audio at {}", snapshot.audio.unwrap());
//!     }
//!     Ok(())
//! }
//! ```

pub mod runner;
pub mod stages;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{download_file_name, PipelineError, PipelineOrchestrator};
pub use stages::{stage_table, Gate, StageSpec, Step};
pub use state::{step_status, PipelineSnapshot, Stage, StepStatus, STEP_TITLES};
