//! Declarative description of a run: which remote steps happen, in which
//! order, and what each one does to the run when it finishes.
//!
//! The orchestrator walks a `Vec<StageSpec>` built by [`stage_table`] instead
//! of hard-coding a sequence per pipeline shape.

use crate::config::{MetadataFailurePolicy, PipelineShape};

use super::state::Stage;

/// A single remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    DocumentInfo,
    Classify,
    Summarize,
    Synthesize,
}

impl Step {
    /// Names the operation in generic failure messages
    /// (`"Error <operation>: …"`).
    pub fn operation(&self) -> &'static str {
        match self {
            Step::Upload => "uploading file",
            Step::DocumentInfo => "reading document info",
            Step::Classify => "analyzing document",
            Step::Summarize => "creating summary",
            Step::Synthesize => "generating audio",
        }
    }
}

/// When the run may move past a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Auto,
    /// Continue on a research paper; otherwise pause until
    /// `continue_after_classification()`.
    ConfirmUnlessResearchPaper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub step: Step,
    /// Stage reached on success; `None` leaves the stage as is.
    pub reaches: Option<Stage>,
    /// A failure halts the run.  Non-fatal failures are logged and skipped.
    pub fatal: bool,
    /// Bump the usage trigger on success.
    pub refresh_usage: bool,
    pub gate: Gate,
}

impl StageSpec {
    const fn new(step: Step, reaches: Option<Stage>) -> Self {
        Self {
            step,
            reaches,
            fatal: true,
            refresh_usage: false,
            gate: Gate::Auto,
        }
    }

    const fn refreshing_usage(mut self) -> Self {
        self.refresh_usage = true;
        self
    }

    const fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    const fn fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }
}

/// Build the step sequence for `shape`.
///
/// ```
/// use pdf_audiobook::config::{MetadataFailurePolicy, PipelineShape};
/// use pdf_audiobook::pipeline::{stage_table, Step};
///
/// let steps: Vec<Step> = stage_table(PipelineShape::Direct, MetadataFailurePolicy::Skip)
///     .iter()
///     .map(|s| s.step)
///     .collect();
/// assert_eq!(steps, [Step::Upload, Step::DocumentInfo, Step::Summarize, Step::Synthesize]);
/// ```
pub fn stage_table(shape: PipelineShape, metadata_failure: MetadataFailurePolicy) -> Vec<StageSpec> {
    let info_fatal = metadata_failure == MetadataFailurePolicy::Abort;

    let mut table = vec![
        StageSpec::new(Step::Upload, Some(Stage::Uploaded)),
        StageSpec::new(Step::DocumentInfo, None).fatal(info_fatal),
    ];

    if shape == PipelineShape::Classified {
        table.push(
            StageSpec::new(Step::Classify, Some(Stage::Analyzed))
                .refreshing_usage()
                .gated(Gate::ConfirmUnlessResearchPaper),
        );
    }

    table.push(StageSpec::new(Step::Summarize, Some(Stage::Summarized)).refreshing_usage());
    table.push(StageSpec::new(Step::Synthesize, Some(Stage::AudioReady)));
    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
