//! Pipeline orchestrator: drives a document through the backend steps.
//!
//! [`PipelineOrchestrator`] owns the [`PipelineSnapshot`] (inside a
//! `tokio::sync::watch` channel) and runs each conversion as a task on the
//! tokio runtime it was given.
//!
//! # Run flow
//!
//! ```text
//! start(document)                                   [Idle, processing]
//!   └─▶ for each StageSpec in the table:
//!         issue request
//!           ├─ Ok  + current generation → apply result, advance stage, status
//!           │        └─ gate says pause   → processing = false, await user
//!           ├─ Err + fatal               → error status, processing = false, halt
//!           ├─ Err + non-fatal           → warn, next step
//!           └─ stale generation          → drop the response, stop
//!
//! continue_after_classification()  → resume the table after the gate
//! reset()                          → generation + 1, back to Idle
//! download_audio(dir)              → write the mp3, AudioReady → Delivered
//! ```
//!
//! Every write from a run goes through `watch::Sender::send_if_modified` and
//! first checks the run's generation, so a response that arrives after
//! `reset()` cannot touch the new run.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{
    ApiError, AudiobookBackend, ClassificationResult, Document, DocumentHandle, DocumentMetadata,
    SummaryResult,
};
use crate::config::PipelineConfig;
use crate::status::{SharedNotifier, StatusKind};

use super::stages::{stage_table, Gate, StageSpec, Step};
use super::state::{PipelineSnapshot, Stage};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// A command issued in a state that does not allow it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("a new run can only start from Idle (current stage: {})", .0.label())]
    NotIdle(Stage),

    #[error("a request is already in flight")]
    Busy,

    #[error("the run is not waiting for confirmation")]
    NotAwaitingConfirmation,

    #[error("no generated audio to download yet")]
    AudioNotReady,
}

// ---------------------------------------------------------------------------
// Status texts
// ---------------------------------------------------------------------------

const RESEARCH_PAPER_DETECTED: &str = "Research paper detected! Creating summary...";
const NOT_A_RESEARCH_PAPER: &str = "Document analyzed! Not a research paper.";
const SUMMARY_CREATED: &str = "Summary created successfully!";
const AUDIO_DOWNLOADED: &str = "Audio book downloaded successfully!";

/// File name a download is saved under: `audiobook_<name without .pdf>.mp3`,
/// or `audiobook_book.mp3` without a document.
///
/// ```
/// use pdf_audiobook::api::DocumentHandle;
/// use pdf_audiobook::pipeline::download_file_name;
///
/// let doc = DocumentHandle { name: "attention.pdf".into(), size_bytes: 10 };
/// assert_eq!(download_file_name(Some(&doc)), "audiobook_attention.mp3");
/// assert_eq!(download_file_name(None), "audiobook_book.mp3");
/// ```
pub fn download_file_name(document: Option<&DocumentHandle>) -> String {
    let stem = document
        .map(|d| {
            let name = d.name.as_str();
            match name.len().checked_sub(4) {
                Some(cut)
                    if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") =>
                {
                    &name[..cut]
                }
                _ => name,
            }
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or("book");
    format!("audiobook_{stem}.mp3")
}

// ---------------------------------------------------------------------------
// Step outputs
// ---------------------------------------------------------------------------

enum StepOutput {
    Uploaded {
        message: String,
        document: DocumentHandle,
    },
    Info(DocumentMetadata),
    Classified(ClassificationResult),
    Summarized(SummaryResult),
    Synthesized(String),
}

/// What the run loop does after applying a step.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Pause,
    Halt,
    Stale,
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives runs against an [`AudiobookBackend`].  Cheap to clone; clones share
/// the same state.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use pdf_audiobook::api::{Document, HttpBackend};
/// use pdf_audiobook::config::AppConfig;
/// use pdf_audiobook::pipeline::PipelineOrchestrator;
/// use pdf_audiobook::status::new_shared_notifier;
///
/// # fn example(runtime: &tokio::runtime::Runtime) -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let backend = Arc::new(HttpBackend::from_config(&config.backend));
/// let orchestrator = PipelineOrchestrator::new(
///     backend,
///     &config.pipeline,
///     new_shared_notifier(),
///     runtime.handle().clone(),
/// );
///
/// orchestrator.start(Document::new("paper.pdf", std::fs::read("paper.pdf")?))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PipelineOrchestrator {
    backend: Arc<dyn AudiobookBackend>,
    stages: Arc<[StageSpec]>,
    state: Arc<watch::Sender<PipelineSnapshot>>,
    usage_epoch: Arc<watch::Sender<u64>>,
    notifier: SharedNotifier,
    runtime: Handle,
}

impl PipelineOrchestrator {
    /// * `config`   — selects the stage table shape and metadata policy.
    /// * `notifier` — receives every user-facing status message.
    /// * `runtime`  — where runs and downloads are spawned.
    pub fn new(
        backend: Arc<dyn AudiobookBackend>,
        config: &PipelineConfig,
        notifier: SharedNotifier,
        runtime: Handle,
    ) -> Self {
        let stages: Arc<[StageSpec]> = stage_table(config.shape, config.metadata_failure).into();
        log::debug!(
            "pipeline: {:?} shape, {} steps, metadata failure {:?}",
            config.shape,
            stages.len(),
            config.metadata_failure
        );

        let (state, _) = watch::channel(PipelineSnapshot::default());
        let (usage_epoch, _) = watch::channel(0u64);

        Self {
            backend,
            stages,
            state: Arc::new(state),
            usage_epoch: Arc::new(usage_epoch),
            notifier,
            runtime,
        }
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.state.subscribe()
    }

    /// Changes after every step that may have consumed tokens.
    pub fn usage_trigger(&self) -> watch::Receiver<u64> {
        self.usage_epoch.subscribe()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Begin a run for `document`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Busy`] while a request is outstanding,
    /// [`PipelineError::NotIdle`] when a previous run has not been reset.
    pub fn start(&self, document: Document) -> Result<JoinHandle<()>, PipelineError> {
        let mut outcome = Err(PipelineError::Busy);
        self.state.send_if_modified(|snap| {
            if snap.processing {
                outcome = Err(PipelineError::Busy);
                return false;
            }
            if snap.stage != Stage::Idle {
                outcome = Err(PipelineError::NotIdle(snap.stage));
                return false;
            }
            snap.processing = true;
            outcome = Ok(snap.generation);
            true
        });
        let generation = outcome.map_err(|e| {
            log::error!("pipeline: cannot start: {e}");
            e
        })?;

        log::info!(
            "pipeline: run {generation} started for {} ({} bytes)",
            document.name,
            document.bytes.len()
        );
        let this = self.clone();
        Ok(self
            .runtime
            .spawn(async move { this.run_from(generation, 0, Some(document)).await }))
    }

    /// Resume a run paused after classifying a non-research document.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotAwaitingConfirmation`] unless the run is paused at
    /// the classification gate.
    pub fn continue_after_classification(&self) -> Result<JoinHandle<()>, PipelineError> {
        let mut outcome = Err(PipelineError::NotAwaitingConfirmation);
        self.state.send_if_modified(|snap| {
            match snap.resume_at {
                Some(index) if snap.awaiting_confirmation && !snap.processing => {
                    snap.awaiting_confirmation = false;
                    snap.resume_at = None;
                    snap.processing = true;
                    outcome = Ok((snap.generation, index));
                    true
                }
                _ => false,
            }
        });
        let (generation, index) = outcome.map_err(|e| {
            log::error!("pipeline: cannot continue: {e}");
            e
        })?;

        log::info!("pipeline: run {generation} confirmed by user, resuming");
        let this = self.clone();
        Ok(self
            .runtime
            .spawn(async move { this.run_from(generation, index, None).await }))
    }

    /// Abandon the current run and return to `Idle`.
    ///
    /// Requests in flight are left to finish; their responses are ignored.
    pub fn reset(&self) {
        let mut generation = 0;
        self.state.send_modify(|snap| {
            generation = snap.generation + 1;
            *snap = PipelineSnapshot::idle(generation);
        });
        self.notifier.lock().unwrap().clear();
        log::info!("pipeline: reset, now at generation {generation}");
    }

    /// Save the generated audio into `dir`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AudioNotReady`] before [`Stage::AudioReady`],
    /// [`PipelineError::Busy`] while another request is outstanding.
    pub fn download_audio(&self, dir: PathBuf) -> Result<JoinHandle<()>, PipelineError> {
        let mut outcome = Err(PipelineError::AudioNotReady);
        self.state.send_if_modified(|snap| {
            if snap.stage < Stage::AudioReady {
                outcome = Err(PipelineError::AudioNotReady);
                return false;
            }
            if snap.processing {
                outcome = Err(PipelineError::Busy);
                return false;
            }
            snap.processing = true;
            outcome = Ok((snap.generation, download_file_name(snap.document.as_ref())));
            true
        });
        let (generation, file_name) = outcome.map_err(|e| {
            log::error!("pipeline: cannot download: {e}");
            e
        })?;

        let this = self.clone();
        Ok(self.runtime.spawn(async move {
            let path = dir.join(file_name);
            let result = this.fetch_and_save(&path).await;
            this.finish_download(generation, path, result);
        }))
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    async fn run_from(self, generation: u64, from: usize, document: Option<Document>) {
        for index in from..self.stages.len() {
            let entry = self.stages[index];
            log::debug!("pipeline: run {generation} step {:?}", entry.step);

            let flow = match self.call(entry.step, document.as_ref()).await {
                Ok(output) => self.apply(generation, index, &entry, output),
                Err(e) => self.fail(generation, &entry, e),
            };

            match flow {
                Flow::Continue => {}
                Flow::Pause => {
                    log::info!("pipeline: run {generation} waiting for confirmation");
                    return;
                }
                Flow::Halt => return,
                Flow::Stale => {
                    log::debug!(
                        "pipeline: run {generation} superseded, dropped {:?} response",
                        entry.step
                    );
                    return;
                }
            }
        }

        self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            snap.processing = false;
            true
        });
        log::info!("pipeline: run {generation} complete");
    }

    async fn call(&self, step: Step, document: Option<&Document>) -> Result<StepOutput, ApiError> {
        match step {
            Step::Upload => {
                let document = document.ok_or_else(|| {
                    ApiError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        "no document to upload",
                    ))
                })?;
                let message = self.backend.upload(document).await?;
                Ok(StepOutput::Uploaded {
                    message,
                    document: document.handle(),
                })
            }
            Step::DocumentInfo => self.backend.document_info().await.map(StepOutput::Info),
            Step::Classify => self.backend.classify().await.map(StepOutput::Classified),
            Step::Summarize => self.backend.summarize().await.map(StepOutput::Summarized),
            Step::Synthesize => self.backend.synthesize().await.map(StepOutput::Synthesized),
        }
    }

    /// Fold a successful response into the snapshot.
    fn apply(&self, generation: u64, index: usize, entry: &StageSpec, output: StepOutput) -> Flow {
        let mut flow = Flow::Continue;

        let current = self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }

            let status = match output {
                StepOutput::Uploaded { message, document } => {
                    snap.document = Some(document);
                    Some((message, StatusKind::Success))
                }
                StepOutput::Info(metadata) => {
                    snap.metadata = Some(metadata);
                    None
                }
                StepOutput::Classified(result) => {
                    snap.classification = Some(result);
                    if result.is_research_paper {
                        Some((RESEARCH_PAPER_DETECTED.to_string(), StatusKind::Success))
                    } else {
                        Some((NOT_A_RESEARCH_PAPER.to_string(), StatusKind::Info))
                    }
                }
                StepOutput::Summarized(summary) => {
                    if snap.classification.is_none() {
                        snap.classification = Some(ClassificationResult {
                            is_research_paper: summary.is_research_paper,
                        });
                    }
                    log::info!("pipeline: summary has {} words", summary.word_count);
                    snap.summary = Some(summary);
                    Some((SUMMARY_CREATED.to_string(), StatusKind::Success))
                }
                StepOutput::Synthesized(message) => {
                    snap.audio = Some(self.backend.audio_locator());
                    Some((message, StatusKind::Success))
                }
            };

            if let Some(stage) = entry.reaches {
                snap.stage = snap.stage.max(stage);
            }

            let research = snap.classification.map(|c| c.is_research_paper);
            if entry.gate == Gate::ConfirmUnlessResearchPaper && research == Some(false) {
                snap.processing = false;
                snap.awaiting_confirmation = true;
                snap.resume_at = Some(index + 1);
                flow = Flow::Pause;
            }

            if let Some((text, kind)) = status {
                self.notifier.lock().unwrap().show(text, kind);
            }
            true
        });

        if !current {
            return Flow::Stale;
        }
        if entry.refresh_usage {
            self.bump_usage_epoch();
        }
        flow
    }

    /// Handle a failed request.
    fn fail(&self, generation: u64, entry: &StageSpec, error: ApiError) -> Flow {
        let operation = entry.step.operation();

        if !entry.fatal {
            if self.state.borrow().generation != generation {
                return Flow::Stale;
            }
            log::warn!("pipeline: {operation} failed, continuing without it: {error}");
            return Flow::Continue;
        }

        let message = error.user_message(operation);
        let current = self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            snap.processing = false;
            self.notifier
                .lock()
                .unwrap()
                .show(message.as_str(), StatusKind::Error);
            true
        });

        if current {
            log::error!("pipeline: run {generation} halted while {operation}: {error}");
            Flow::Halt
        } else {
            Flow::Stale
        }
    }

    fn bump_usage_epoch(&self) {
        self.usage_epoch.send_modify(|epoch| *epoch += 1);
        log::debug!("pipeline: usage epoch now {}", *self.usage_epoch.borrow());
    }

    // -----------------------------------------------------------------------
    // Download
    // -----------------------------------------------------------------------

    async fn fetch_and_save(&self, path: &Path) -> Result<(), ApiError> {
        let bytes = self.backend.download_audio().await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;
        log::info!("pipeline: wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn finish_download(&self, generation: u64, path: PathBuf, result: Result<(), ApiError>) {
        let current = self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            snap.processing = false;
            let mut notifier = self.notifier.lock().unwrap();
            match &result {
                Ok(()) => {
                    snap.stage = snap.stage.max(Stage::Delivered);
                    snap.saved_to = Some(path.clone());
                    notifier.show(AUDIO_DOWNLOADED, StatusKind::Success);
                }
                Err(e) => {
                    notifier.show(e.user_message("downloading audio"), StatusKind::Error);
                }
            }
            true
        });

        if let (true, Err(e)) = (current, &result) {
            log::error!("pipeline: download failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
