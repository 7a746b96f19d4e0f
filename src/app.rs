//! PDF-to-audiobook window — egui/eframe application.
//!
//! # Architecture
//!
//! [`AudiobookApp`] is the top-level [`eframe::App`].  It never talks to the
//! backend itself:
//!
//! * pipeline commands go to the [`PipelineOrchestrator`], whose
//!   [`PipelineSnapshot`] is read from a watch receiver every frame;
//! * status messages are read from the [`SharedNotifier`];
//! * the quota panel reads [`SharedUsage`], kept fresh by the usage monitor;
//! * the player is a [`PlaybackController`] owned here, on the UI thread.
//!
//! # Layout
//!
//! | Area | Contents |
//! |------|----------|
//! | Top | title, status banner |
//! | Right | today's token usage, history |
//! | Centre | steps, upload / document / analysis / summary cards, player |

use std::path::{Path, PathBuf};
use std::time::Duration;

use eframe::egui;
use tokio::sync::watch;

use crate::api::{Document, DocumentError};
use crate::config::AppConfig;
use crate::pipeline::{
    step_status, PipelineOrchestrator, PipelineSnapshot, Stage, StepStatus, STEP_TITLES,
};
use crate::playback::{
    format_time, fraction_from_pointer, CpalTransport, PlaybackController, Transport,
};
use crate::status::{SharedNotifier, StatusKind};
use crate::usage::display::group_thousands;
use crate::usage::{SharedUsage, UsageDisplay};

/// How often the window repaints while nothing else asks it to.
const IDLE_REPAINT: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

const ACCENT: egui::Color32 = egui::Color32::from_rgb(37, 99, 235);
const MUTED: egui::Color32 = egui::Color32::from_rgb(110, 110, 120);
const CARD_FILL: egui::Color32 = egui::Color32::from_rgb(250, 250, 252);

/// Banner `(text, fill)` colours for a status kind.
fn status_colors(kind: StatusKind) -> (egui::Color32, egui::Color32) {
    match kind {
        StatusKind::Info => (
            egui::Color32::from_rgb(30, 64, 175),
            egui::Color32::from_rgb(219, 234, 254),
        ),
        StatusKind::Success => (
            egui::Color32::from_rgb(22, 101, 52),
            egui::Color32::from_rgb(220, 252, 231),
        ),
        StatusKind::Error => (
            egui::Color32::from_rgb(153, 27, 27),
            egui::Color32::from_rgb(254, 226, 226),
        ),
    }
}

fn step_color(status: StepStatus) -> egui::Color32 {
    match status {
        StepStatus::Completed => egui::Color32::from_rgb(34, 197, 94),
        StepStatus::Processing => ACCENT,
        StepStatus::Current => egui::Color32::from_rgb(59, 130, 246),
        StepStatus::Pending => egui::Color32::from_rgb(180, 180, 190),
    }
}

fn card(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::new()
        .fill(CARD_FILL)
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::same(12))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(225, 225, 232)))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(title).strong().size(15.0));
            ui.add_space(6.0);
            add_contents(ui);
        });
    ui.add_space(10.0);
}

// ---------------------------------------------------------------------------
// Document intake
// ---------------------------------------------------------------------------

/// Turn a file dropped on the window into an upload payload.
fn document_from_drop(file: &egui::DroppedFile) -> Result<Document, DocumentError> {
    if let Some(path) = &file.path {
        return Document::from_path(path);
    }
    let bytes = file.bytes.as_ref().ok_or(DocumentError::NoFileName)?;
    if !file.name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(DocumentError::NotPdf(file.name.clone()));
    }
    Ok(Document::new(file.name.clone(), bytes.to_vec()))
}

// ---------------------------------------------------------------------------
// AudiobookApp
// ---------------------------------------------------------------------------

/// eframe application — the audiobook converter window.
pub struct AudiobookApp<T: Transport = CpalTransport> {
    // ── Collaborators ────────────────────────────────────────────────────
    orchestrator: PipelineOrchestrator,
    snapshot_rx: watch::Receiver<PipelineSnapshot>,
    notifier: SharedNotifier,
    usage: SharedUsage,
    player: PlaybackController<T>,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Contents of the "PDF path" field.
    path_input: String,
    /// Full summary instead of the preview.
    summary_expanded: bool,
    /// Usage history list is open.
    show_history: bool,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
}

impl<T: Transport> AudiobookApp<T> {
    /// * `player` — controller around the transport the app plays through.
    pub fn new(
        orchestrator: PipelineOrchestrator,
        notifier: SharedNotifier,
        usage: SharedUsage,
        player: PlaybackController<T>,
        config: AppConfig,
    ) -> Self {
        Self {
            snapshot_rx: orchestrator.subscribe(),
            orchestrator,
            notifier,
            usage,
            player,
            path_input: String::new(),
            summary_expanded: false,
            show_history: false,
            config,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────

    fn submit(&mut self, document: Result<Document, DocumentError>) {
        match document {
            Ok(document) => {
                if self.orchestrator.start(document).is_ok() {
                    self.summary_expanded = false;
                }
            }
            Err(e) => {
                log::warn!("upload rejected locally: {e}");
                self.notifier
                    .lock()
                    .unwrap()
                    .show("Please upload a valid PDF file", StatusKind::Error);
            }
        }
    }

    fn submit_path(&mut self) {
        let path = PathBuf::from(self.path_input.trim());
        self.submit(Document::from_path(&path));
    }

    fn convert_another(&mut self) {
        self.orchestrator.reset();
        self.player.load(None);
        self.path_input.clear();
        self.summary_expanded = false;
    }

    fn download(&mut self) {
        let dir = self.config.ui.resolved_download_dir();
        if let Err(e) = self.orchestrator.download_audio(dir) {
            log::debug!("download not started: {e}");
        }
    }

    /// Keep the player pointed at whatever locator the pipeline published.
    fn sync_player(&mut self, snapshot: &PipelineSnapshot) {
        follow_pipeline(&mut self.player, snapshot);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context, snapshot: &PipelineSnapshot) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.first() else {
            return;
        };
        if snapshot.stage != Stage::Idle || snapshot.processing {
            log::debug!("ignoring dropped file while a run is active");
            return;
        }
        self.submit(document_from_drop(file));
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_header(&self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("PDF to Audiobook").strong().size(20.0));
            ui.label(
                egui::RichText::new("AI-powered summaries, read aloud")
                    .color(MUTED)
                    .size(12.0),
            );
        });

        let current = self.notifier.lock().unwrap().current().cloned();
        if let Some(msg) = current {
            let (text, fill) = status_colors(msg.kind);
            ui.add_space(4.0);
            egui::Frame::new()
                .fill(fill)
                .corner_radius(egui::CornerRadius::same(6))
                .inner_margin(egui::Margin::symmetric(10, 6))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.label(egui::RichText::new(msg.text).color(text));
                });
        }
        ui.add_space(6.0);
    }

    fn draw_steps(&self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        ui.horizontal_wrapped(|ui| {
            for (i, title) in STEP_TITLES.iter().enumerate() {
                let id = i + 1;
                let status = step_status(id, snapshot.stage, snapshot.processing);
                let marker = match status {
                    StepStatus::Completed => "✔".to_string(),
                    _ => id.to_string(),
                };
                ui.label(
                    egui::RichText::new(format!("{marker} {title}"))
                        .color(step_color(status))
                        .strong(),
                );
                if status == StepStatus::Processing {
                    ui.spinner();
                }
                if id < STEP_TITLES.len() {
                    ui.label(egui::RichText::new("›").color(MUTED));
                }
            }
        });

        if snapshot.shows_progress() {
            ui.add(
                egui::ProgressBar::new(snapshot.stage.progress_fraction())
                    .desired_height(6.0)
                    .fill(ACCENT),
            );
        }
        ui.add_space(10.0);
    }

    fn draw_upload(&mut self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        card(ui, "Upload Your PDF Document", |ui| {
            ui.label(
                egui::RichText::new(
                    "Convert any PDF into an engaging audiobook with AI-powered summarization",
                )
                .color(MUTED),
            );
            ui.add_space(8.0);
            ui.label("Drag & drop your PDF onto this window, or enter its path:");
            ui.horizontal(|ui| {
                let field = ui.add(
                    egui::TextEdit::singleline(&mut self.path_input)
                        .hint_text("/path/to/document.pdf")
                        .desired_width(ui.available_width() - 90.0),
                );
                let enter = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                let ready = !snapshot.processing && !self.path_input.trim().is_empty();
                let clicked = ui
                    .add_enabled(ready, egui::Button::new("Convert"))
                    .clicked();
                if ready && (clicked || enter) {
                    self.submit_path();
                }
            });
            if snapshot.processing {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(snapshot.stage.activity());
                });
            }
        });
    }

    fn draw_document(&self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        if let Some(doc) = &snapshot.document {
            card(ui, "Uploaded Document", |ui| {
                ui.label(egui::RichText::new(&doc.name).strong());
                ui.label(egui::RichText::new(format!("{:.2} MB", doc.size_mb())).color(MUTED));
            });
        }

        if let Some(meta) = &snapshot.metadata {
            card(ui, "Document Information", |ui| {
                egui::Grid::new("doc_info").num_columns(2).show(ui, |ui| {
                    ui.label(egui::RichText::new("File Size:").color(MUTED));
                    ui.label(format!("{} MB", meta.size_mb));
                    ui.end_row();
                    ui.label(egui::RichText::new("Total PDFs:").color(MUTED));
                    ui.label(meta.total_known_documents.to_string());
                    ui.end_row();
                });
            });
        }
    }

    fn draw_analysis(&mut self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        let Some(classification) = snapshot.classification else {
            return;
        };

        card(ui, "Document Analysis", |ui| {
            if classification.is_research_paper {
                ui.label(
                    egui::RichText::new("✓ This is a Research Paper")
                        .color(egui::Color32::from_rgb(22, 163, 74))
                        .strong(),
                );
                return;
            }

            ui.label(
                egui::RichText::new("ℹ This is NOT a Research Paper")
                    .color(egui::Color32::from_rgb(234, 88, 12))
                    .strong(),
            );
            if snapshot.awaiting_confirmation {
                ui.add_space(4.0);
                ui.label(
                    egui::RichText::new(
                        "Since this is not a research paper, you can manually proceed to summarization.",
                    )
                    .color(MUTED),
                );
                let label = if snapshot.processing {
                    "Processing..."
                } else {
                    "Create Summary & Audio"
                };
                if ui
                    .add_enabled(!snapshot.processing, egui::Button::new(label))
                    .clicked()
                {
                    if let Err(e) = self.orchestrator.continue_after_classification() {
                        log::debug!("continue ignored: {e}");
                    }
                }
            }
        });
    }

    fn draw_summary(&mut self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        let Some(summary) = &snapshot.summary else {
            return;
        };

        card(ui, "Document Summary", |ui| {
            egui::Grid::new("summary_stats").num_columns(2).show(ui, |ui| {
                ui.label(egui::RichText::new("Word Count:").color(MUTED));
                ui.label(summary.word_count.to_string());
                ui.end_row();
                ui.label(egui::RichText::new("Document Type:").color(MUTED));
                ui.label(summary.document_type_label());
                ui.end_row();
                ui.label(egui::RichText::new("Status:").color(MUTED));
                ui.label(
                    egui::RichText::new("Processed").color(egui::Color32::from_rgb(22, 163, 74)),
                );
                ui.end_row();
            });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let heading = if self.summary_expanded {
                    "Full Summary:"
                } else {
                    "Summary Preview:"
                };
                ui.label(egui::RichText::new(heading).strong());
                let toggle = if self.summary_expanded {
                    "▲ Collapse"
                } else {
                    "▼ Expand"
                };
                if ui.small_button(toggle).clicked() {
                    self.summary_expanded = !self.summary_expanded;
                }
            });

            let max_height = if self.summary_expanded { f32::INFINITY } else { 220.0 };
            egui::ScrollArea::vertical()
                .id_salt("summary_text")
                .max_height(max_height)
                .show(ui, |ui| {
                    ui.label(summary.display(self.summary_expanded));
                });
        });
    }

    fn draw_processing(&self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        if !snapshot.processing || snapshot.stage == Stage::Idle {
            return;
        }
        card(ui, "Working", |ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(snapshot.stage.activity());
            });
            ui.add(egui::ProgressBar::new(snapshot.stage.progress_fraction()).show_percentage());
        });
    }

    fn draw_player(&mut self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        if snapshot.audio.is_none() {
            return;
        }

        card(ui, "Your Audio Book", |ui| {
            let state = self.player.state().clone();

            // Seek track
            let (rect, response) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), 10.0),
                egui::Sense::click(),
            );
            let painter = ui.painter();
            painter.rect_filled(rect, 4.0, egui::Color32::from_rgb(220, 220, 228));
            let mut filled = rect;
            filled.set_width(rect.width() * state.progress_fraction() as f32);
            painter.rect_filled(filled, 4.0, ACCENT);
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    if let Some(f) = fraction_from_pointer(pos.x, rect.left(), rect.width()) {
                        self.player.seek_to_fraction(f);
                    }
                }
            }

            ui.horizontal(|ui| {
                ui.label(format_time(state.position_secs));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format_time(state.duration_secs));
                });
            });

            if state.is_buffering {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(egui::RichText::new("Loading audio...").color(MUTED));
                });
            }

            let skip = self.config.player.skip_secs;
            ui.horizontal(|ui| {
                if ui.button(format!("⏪ {skip:.0}s")).clicked() {
                    self.player.skip(-skip);
                }
                let play_label = if state.is_playing { "⏸ Pause" } else { "▶ Play" };
                if ui
                    .add_enabled(!state.is_buffering, egui::Button::new(play_label))
                    .clicked()
                {
                    self.player.toggle_play_pause();
                }
                if ui.button(format!("{skip:.0}s ⏩")).clicked() {
                    self.player.skip(skip);
                }
            });

            ui.horizontal(|ui| {
                let mute_label = if state.is_muted || state.volume == 0.0 {
                    "🔇"
                } else {
                    "🔊"
                };
                if ui.button(mute_label).clicked() {
                    self.player.toggle_mute();
                }
                let mut volume = state.effective_volume();
                if ui
                    .add(egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false))
                    .changed()
                {
                    self.player.set_volume(volume);
                }
            });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!snapshot.processing, egui::Button::new("⬇ Download"))
                    .clicked()
                {
                    self.download();
                }
                if ui.button("🔄 Convert Another").clicked() {
                    self.convert_another();
                }
            });
            if let Some(path) = &snapshot.saved_to {
                ui.label(
                    egui::RichText::new(format!("Saved to {}", display_path(path)))
                        .color(MUTED)
                        .size(11.0),
                );
            }
        });
    }

    /// Way back to `Idle` for runs the player card does not cover: failed,
    /// paused or still in flight.
    fn draw_start_over(&mut self, ui: &mut egui::Ui, snapshot: &PipelineSnapshot) {
        if !can_start_over(snapshot) || snapshot.audio.is_some() {
            return;
        }
        ui.horizontal(|ui| {
            if ui.button("🔄 Convert Another").clicked() {
                self.convert_another();
            }
            if snapshot.processing {
                ui.label(egui::RichText::new("Cancels the current conversion").color(MUTED));
            }
        });
    }

    fn draw_usage(&mut self, ui: &mut egui::Ui) {
        let st = self.usage.lock().unwrap();
        ui.add_space(8.0);
        ui.label(egui::RichText::new("Today's Token Usage").strong());
        ui.add_space(4.0);

        let Some(snapshot) = st.snapshot.clone() else {
            let text = if st.loading {
                "Loading token data..."
            } else {
                "Token data unavailable"
            };
            ui.label(egui::RichText::new(text).color(MUTED));
            return;
        };
        drop(st);

        let display = UsageDisplay::from_snapshot(&snapshot);
        let (r, g, b) = display.band.rgb();
        let band_color = egui::Color32::from_rgb(r, g, b);

        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("{:.1}%", display.percent))
                    .color(band_color)
                    .strong()
                    .size(18.0),
            );
            ui.label(egui::RichText::new(display.band.label()).color(band_color));
        });
        ui.add(
            egui::ProgressBar::new((display.percent / 100.0) as f32)
                .desired_height(8.0)
                .fill(band_color),
        );
        ui.label(format!(
            "{} / {} tokens",
            group_thousands(snapshot.today.total_tokens),
            group_thousands(snapshot.daily_limit)
        ));

        ui.add_space(6.0);
        egui::Grid::new("usage_split").num_columns(2).show(ui, |ui| {
            ui.label(egui::RichText::new("Input").color(MUTED));
            ui.label(group_thousands(snapshot.today.input_tokens));
            ui.end_row();
            ui.label(egui::RichText::new("Output").color(MUTED));
            ui.label(group_thousands(snapshot.today.output_tokens));
            ui.end_row();
        });

        ui.add_space(6.0);
        ui.label(format!("Remaining today: {}", group_thousands(display.remaining)));

        ui.add_space(6.0);
        let toggle = if self.show_history { "▲ Last 7 Days" } else { "▼ Last 7 Days" };
        if ui.small_button(toggle).clicked() {
            self.show_history = !self.show_history;
        }
        if self.show_history {
            if snapshot.history.is_empty() {
                ui.label(egui::RichText::new("No earlier usage").color(MUTED));
            }
            for day in &snapshot.history {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&day.date_key).color(MUTED));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(group_thousands(day.total_tokens));
                    });
                });
            }
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Anything to throw away: a run in flight, a paused or failed run, or a
/// finished one.
fn can_start_over(snapshot: &PipelineSnapshot) -> bool {
    snapshot.processing || snapshot.stage != Stage::Idle || snapshot.document.is_some()
}

/// Point `player` at whatever locator the pipeline published, then drain its
/// events.
fn follow_pipeline<T: Transport>(player: &mut PlaybackController<T>, snapshot: &PipelineSnapshot) {
    if player.locator() != snapshot.audio.as_ref() {
        player.load(snapshot.audio.clone());
    }
    player.pump();
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl<T: Transport> eframe::App for AudiobookApp<T> {
    /// Called every frame by eframe.  Reads the latest snapshot, feeds the
    /// player, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot = self.snapshot_rx.borrow_and_update().clone();

        self.sync_player(&snapshot);
        self.handle_dropped_files(ctx, &snapshot);

        // Status expiry, processing spinners and playback position all change
        // without user input.
        ctx.request_repaint_after(IDLE_REPAINT);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            self.draw_header(ui);
        });

        egui::SidePanel::right("usage")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                self.draw_usage(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw_steps(ui, &snapshot);

                if snapshot.stage == Stage::Idle && snapshot.document.is_none() {
                    self.draw_upload(ui, &snapshot);
                } else {
                    self.draw_document(ui, &snapshot);
                    self.draw_analysis(ui, &snapshot);
                    self.draw_summary(ui, &snapshot);
                    self.draw_processing(ui, &snapshot);
                    self.draw_player(ui, &snapshot);
                }
                self.draw_start_over(ui, &snapshot);
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("audiobook window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::runtime::Handle;

    use super::*;
    use crate::api::mock::{rejected, MockBackend, MOCK_AUDIO_URL};
    use crate::config::PipelineConfig;
    use crate::playback::mock::{Call, MockTransport};
    use crate::status::new_shared_notifier;

    fn orchestrator(backend: MockBackend) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            Arc::new(backend),
            &PipelineConfig::default(),
            new_shared_notifier(),
            Handle::current(),
        )
    }

    fn paper() -> Document {
        Document::new("attention.pdf", b"%PDF-1.7".to_vec())
    }

    // ---- pipeline -> player handoff ----------------------------------------

    #[tokio::test]
    async fn finished_run_hands_locator_to_player() {
        let orc = orchestrator(MockBackend::happy());
        let mut player = PlaybackController::new(MockTransport::default(), 1.0);

        orc.start(paper()).unwrap().await.unwrap();
        follow_pipeline(&mut player, &orc.snapshot());

        assert_eq!(player.locator().map(|l| l.as_str()), Some(MOCK_AUDIO_URL));
        assert!(player.transport().is_attached());
        assert!(player.state().is_buffering);
        assert!(player
            .transport()
            .calls
            .contains(&Call::Attach(MOCK_AUDIO_URL.into())));

        // Same locator on the next frame: no reload.
        let calls = player.transport().calls.len();
        follow_pipeline(&mut player, &orc.snapshot());
        assert_eq!(player.transport().calls.len(), calls);
    }

    #[tokio::test]
    async fn reset_detaches_player() {
        let orc = orchestrator(MockBackend::happy());
        let mut player = PlaybackController::new(MockTransport::default(), 1.0);
        orc.start(paper()).unwrap().await.unwrap();
        follow_pipeline(&mut player, &orc.snapshot());

        orc.reset();
        follow_pipeline(&mut player, &orc.snapshot());

        assert!(player.locator().is_none());
        assert!(!player.transport().is_attached());
        assert_eq!(player.transport().calls.last(), Some(&Call::Detach));
    }

    #[tokio::test]
    async fn no_locator_while_run_is_incomplete() {
        let backend = MockBackend::happy().with_synthesize(|| Err(rejected("tts down")));
        let orc = orchestrator(backend);
        let mut player = PlaybackController::new(MockTransport::default(), 1.0);

        orc.start(paper()).unwrap().await.unwrap();
        follow_pipeline(&mut player, &orc.snapshot());

        assert!(player.locator().is_none());
        assert!(!player.transport().is_attached());
        assert!(!player
            .transport()
            .calls
            .iter()
            .any(|c| matches!(c, Call::Attach(_))));
    }

    // ---- can_start_over ----------------------------------------------------

    #[test]
    fn fresh_window_has_nothing_to_start_over() {
        assert!(!can_start_over(&PipelineSnapshot::default()));
    }

    #[test]
    fn upload_in_flight_can_be_abandoned() {
        let snap = PipelineSnapshot {
            processing: true,
            ..PipelineSnapshot::default()
        };
        assert!(can_start_over(&snap));
    }

    #[tokio::test]
    async fn failed_run_offers_start_over() {
        let backend = MockBackend::happy().with_summarize(|| Err(rejected("model overloaded")));
        let orc = orchestrator(backend);

        orc.start(paper()).unwrap().await.unwrap();
        let snap = orc.snapshot();
        assert_eq!(snap.stage, Stage::Analyzed);
        assert!(!snap.processing);
        assert!(snap.audio.is_none());
        assert!(can_start_over(&snap));

        orc.reset();
        assert!(!can_start_over(&orc.snapshot()));
    }

    #[tokio::test]
    async fn paused_run_offers_start_over() {
        let backend = MockBackend::happy().with_classify(|| {
            Ok(crate::api::ClassificationResult {
                is_research_paper: false,
            })
        });
        let orc = orchestrator(backend);

        orc.start(paper()).unwrap().await.unwrap();
        let snap = orc.snapshot();
        assert!(snap.awaiting_confirmation);
        assert!(can_start_over(&snap));
    }

    // ---- helpers -----------------------------------------------------------

    #[test]
    fn status_kinds_have_distinct_banners() {
        let info = status_colors(StatusKind::Info);
        let ok = status_colors(StatusKind::Success);
        let err = status_colors(StatusKind::Error);
        assert_ne!(info, ok);
        assert_ne!(ok, err);
        assert_ne!(info, err);
    }

    #[test]
    fn dropped_bytes_with_pdf_name_become_document() {
        let file = egui::DroppedFile {
            name: "Paper.PDF".into(),
            bytes: Some(Arc::from(&b"%PDF"[..])),
            ..Default::default()
        };
        let doc = document_from_drop(&file).unwrap();
        assert_eq!(doc.name, "Paper.PDF");
        assert_eq!(doc.bytes, b"%PDF");
    }

    #[test]
    fn dropped_non_pdf_is_rejected() {
        let file = egui::DroppedFile {
            name: "notes.txt".into(),
            bytes: Some(Arc::from(&b"hello"[..])),
            ..Default::default()
        };
        assert!(matches!(
            document_from_drop(&file),
            Err(DocumentError::NotPdf(_))
        ));
    }

    #[test]
    fn dropped_file_without_content_is_rejected() {
        let file = egui::DroppedFile::default();
        assert!(document_from_drop(&file).is_err());
    }
}
