//! Application entry point — PDF to Audiobook.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the HTTP backend client from config.
//! 5. Create the status notifier and the pipeline orchestrator.
//! 6. Spawn the usage monitor, driven by the orchestrator's usage trigger.
//! 7. Build the playback controller on the cpal output transport.
//! 8. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use pdf_audiobook::{
    api::{AudiobookBackend, HttpBackend},
    app::AudiobookApp,
    config::AppConfig,
    pipeline::PipelineOrchestrator,
    playback::{CpalTransport, PlaybackController},
    status::new_shared_notifier,
    usage::{new_shared_usage, UsageMonitor},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("PDF to Audiobook")
        .with_inner_size([w, h])
        .with_min_inner_size([720.0, 480.0])
        .with_drag_and_drop(true);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("PDF to Audiobook starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!("backend: {}", config.backend.base_url);

    // 3. Tokio runtime (2 worker threads — pipeline runs and audio loading)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Backend
    let backend: Arc<dyn AudiobookBackend> = Arc::new(HttpBackend::from_config(&config.backend));

    // 5. Notifier + orchestrator
    let notifier = new_shared_notifier();
    let orchestrator = PipelineOrchestrator::new(
        Arc::clone(&backend),
        &config.pipeline,
        Arc::clone(&notifier),
        rt.handle().clone(),
    );

    // 6. Usage monitor — refreshes on start and after every usage-bearing step
    let usage = new_shared_usage();
    rt.spawn(
        UsageMonitor::new(
            Arc::clone(&backend),
            Arc::clone(&usage),
            config.usage.history_days,
        )
        .run(orchestrator.usage_trigger()),
    );

    // 7. Playback
    let transport = CpalTransport::new(
        Arc::clone(&backend),
        rt.handle().clone(),
        config.player.output_device.clone(),
    );
    let player = PlaybackController::new(transport, config.player.initial_volume);

    // 8. Build the egui app and run it (blocks until the window is closed)
    let options = native_options(&config);
    let app = AudiobookApp::new(orchestrator, notifier, usage, player, config);

    let result = eframe::run_native(
        "PDF to Audiobook",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    // In-flight runs and loads are abandoned with the runtime.
    rt.shutdown_background();
    result
}
