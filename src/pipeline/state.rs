//! Pipeline stages and the snapshot the UI renders from.
//!
//! [`Stage`] is the run's progress marker.  [`PipelineSnapshot`] is the single
//! source of truth for everything the pipeline owns: stage, processing flag,
//! and the results collected so far.  It lives in a `tokio::sync::watch`
//! channel owned by the orchestrator; readers get it through
//! [`PipelineOrchestrator::snapshot`](super::PipelineOrchestrator::snapshot)
//! or a subscription.

use std::path::PathBuf;

use crate::api::{
    AudioLocator, ClassificationResult, DocumentHandle, DocumentMetadata, SummaryResult,
};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Progress of a run.
///
/// ```text
/// Idle ──upload──▶ Uploaded ──classify──▶ Analyzed ──summarize──▶ Summarized
///      ──synthesize──▶ AudioReady ──download──▶ Delivered
/// any stage ──reset()──▶ Idle
/// ```
///
/// The order is total and a run never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Idle,
    Uploaded,
    Analyzed,
    Summarized,
    AudioReady,
    Delivered,
}

impl Stage {
    /// Ordinal, `Idle = 0` … `Delivered = 5`.
    ///
    /// ```
    /// use pdf_audiobook::pipeline::Stage;
    ///
    /// assert_eq!(Stage::Idle.index(), 0);
    /// assert_eq!(Stage::AudioReady.index(), 4);
    /// assert!(Stage::Uploaded < Stage::Summarized);
    /// ```
    pub fn index(&self) -> usize {
        match self {
            Stage::Idle => 0,
            Stage::Uploaded => 1,
            Stage::Analyzed => 2,
            Stage::Summarized => 3,
            Stage::AudioReady => 4,
            Stage::Delivered => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::Uploaded => "Uploaded",
            Stage::Analyzed => "Analyzed",
            Stage::Summarized => "Summarized",
            Stage::AudioReady => "Audio ready",
            Stage::Delivered => "Delivered",
        }
    }

    /// What is being worked on while a request from this stage is in flight.
    pub fn activity(&self) -> &'static str {
        match self {
            Stage::Idle | Stage::Uploaded => "Uploading and analyzing your PDF...",
            Stage::Analyzed => "Creating AI-powered summary...",
            Stage::Summarized => "Generating audio book...",
            Stage::AudioReady | Stage::Delivered => "Downloading audio book...",
        }
    }

    /// Fill of the processing bar, reaching 1.0 at [`Stage::AudioReady`].
    pub fn progress_fraction(&self) -> f32 {
        self.index().min(4) as f32 / 4.0
    }
}

// ---------------------------------------------------------------------------
// Steps as the UI lists them
// ---------------------------------------------------------------------------

/// The five user-visible steps, 1-based.
pub const STEP_TITLES: [&str; 5] = [
    "Upload PDF",
    "Analyze Document",
    "Create Summary",
    "Generate Audio",
    "Download & Play",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Processing,
    Current,
    Pending,
}

/// Status of UI step `step_id` (1-based) given the run's stage.
///
/// The step being worked on is `stage.index() + 1`; everything before it is
/// complete.
///
/// ```
/// use pdf_audiobook::pipeline::{step_status, Stage, StepStatus};
///
/// assert_eq!(step_status(1, Stage::Uploaded, true), StepStatus::Completed);
/// assert_eq!(step_status(2, Stage::Uploaded, true), StepStatus::Processing);
/// assert_eq!(step_status(3, Stage::Uploaded, true), StepStatus::Pending);
/// ```
pub fn step_status(step_id: usize, stage: Stage, processing: bool) -> StepStatus {
    let current = stage.index() + 1;
    if step_id < current {
        StepStatus::Completed
    } else if step_id == current {
        if processing {
            StepStatus::Processing
        } else {
            StepStatus::Current
        }
    } else {
        StepStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// PipelineSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineSnapshot {
    /// Bumped by every `reset()`.  Responses tagged with an older value are
    /// discarded.
    pub generation: u64,
    pub stage: Stage,
    /// A request for this run is outstanding.
    pub processing: bool,
    /// Set once the upload succeeds.
    pub document: Option<DocumentHandle>,
    pub metadata: Option<DocumentMetadata>,
    pub classification: Option<ClassificationResult>,
    pub summary: Option<SummaryResult>,
    /// Published on reaching [`Stage::AudioReady`].
    pub audio: Option<AudioLocator>,
    /// Paused after classifying a non-research document.
    pub awaiting_confirmation: bool,
    /// Where the last successful download was written.
    pub saved_to: Option<PathBuf>,
    /// Stage-table index the run resumes from after confirmation.
    pub(crate) resume_at: Option<usize>,
}

impl PipelineSnapshot {
    /// Fresh `Idle` state for `generation`.
    pub(crate) fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Whether the step progress bar is shown.  Hidden once a document has
    /// been classified as something other than a research paper.
    pub fn shows_progress(&self) -> bool {
        self.classification.map_or(true, |c| c.is_research_paper)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Stage ---

    #[test]
    fn stages_are_totally_ordered() {
        let all = [
            Stage::Idle,
            Stage::Uploaded,
            Stage::Analyzed,
            Stage::Summarized,
            Stage::AudioReady,
            Stage::Delivered,
        ];
        for (i, pair) in all.windows(2).enumerate() {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].index(), i);
        }
    }

    #[test]
    fn default_stage_is_idle() {
        assert_eq!(Stage::default(), Stage::Idle);
    }

    #[test]
    fn progress_fraction_caps_at_audio_ready() {
        assert_eq!(Stage::Idle.progress_fraction(), 0.0);
        assert_eq!(Stage::Analyzed.progress_fraction(), 0.5);
        assert_eq!(Stage::AudioReady.progress_fraction(), 1.0);
        assert_eq!(Stage::Delivered.progress_fraction(), 1.0);
    }

    // ---- step_status ---

    #[test]
    fn idle_makes_upload_current() {
        assert_eq!(step_status(1, Stage::Idle, false), StepStatus::Current);
        assert_eq!(step_status(1, Stage::Idle, true), StepStatus::Processing);
        assert_eq!(step_status(2, Stage::Idle, false), StepStatus::Pending);
    }

    #[test]
    fn audio_ready_leaves_download_step_current() {
        for id in 1..=4 {
            assert_eq!(step_status(id, Stage::AudioReady, false), StepStatus::Completed);
        }
        assert_eq!(step_status(5, Stage::AudioReady, false), StepStatus::Current);
    }

    #[test]
    fn delivered_completes_every_step() {
        for id in 1..=STEP_TITLES.len() {
            assert_eq!(step_status(id, Stage::Delivered, false), StepStatus::Completed);
        }
    }

    // ---- PipelineSnapshot ---

    #[test]
    fn idle_snapshot_keeps_generation_only() {
        let snap = PipelineSnapshot::idle(7);
        assert_eq!(snap.generation, 7);
        assert_eq!(snap.stage, Stage::Idle);
        assert!(!snap.processing);
        assert!(snap.document.is_none());
        assert!(snap.audio.is_none());
        assert!(snap.resume_at.is_none());
    }

    #[test]
    fn progress_hidden_for_non_research_documents() {
        let mut snap = PipelineSnapshot::idle(0);
        assert!(snap.shows_progress());
        snap.classification = Some(ClassificationResult {
            is_research_paper: true,
        });
        assert!(snap.shows_progress());
        snap.classification = Some(ClassificationResult {
            is_research_paper: false,
        });
        assert!(!snap.shows_progress());
    }
}
