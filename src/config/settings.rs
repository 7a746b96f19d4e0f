//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// PipelineShape
// ---------------------------------------------------------------------------

/// Selects which stage table the orchestrator interprets.
///
/// | Variant    | Remote steps                                        |
/// |------------|-----------------------------------------------------|
/// | Classified | upload → info → classify → summarize → synthesize  |
/// | Direct     | upload → info → summarize → synthesize             |
///
/// In `Classified` mode a document that is not recognised as a research
/// paper pauses after classification until the user confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineShape {
    Classified,
    Direct,
}

impl Default for PipelineShape {
    fn default() -> Self {
        Self::Classified
    }
}

// ---------------------------------------------------------------------------
// MetadataFailurePolicy
// ---------------------------------------------------------------------------

/// What a failed document-info request does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataFailurePolicy {
    /// Log it, omit the info panel, carry on with the next step.
    Skip,
    /// Halt the run with an error status, like any other stage failure.
    Abort,
}

impl Default for MetadataFailurePolicy {
    fn default() -> Self {
        Self::Skip
    }
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Where the audiobook backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.  `None` leaves reqwest's default
    /// (no timeout), so a hung request keeps the run processing until the
    /// user resets.
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub shape: PipelineShape,
    pub metadata_failure: MetadataFailurePolicy,
}

// ---------------------------------------------------------------------------
// PlayerConfig
// ---------------------------------------------------------------------------

/// Settings for the audiobook player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Jump size of the back / forward buttons, in seconds.
    pub skip_secs: f64,
    /// Volume applied when the player first opens (0.0 – 1.0).
    pub initial_volume: f32,
    /// Output device name — `None` means the system default.
    pub output_device: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            skip_secs: 10.0,
            initial_volume: 1.0,
            output_device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UsageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Number of prior days kept in the usage history panel.
    pub history_days: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self { history_days: 7 }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window and file-handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Initial window size `(width, height)` in logical pixels.
    pub window_size: (f32, f32),
    /// Where downloaded audiobooks are written.  `None` means the platform
    /// Downloads folder.
    pub download_dir: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (1100.0, 760.0),
            download_dir: None,
        }
    }
}

impl UiConfig {
    /// The configured download directory, or the platform default.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().downloads_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use pdf_audiobook::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection settings.
    pub backend: BackendConfig,
    /// Pipeline shape and failure policy.
    pub pipeline: PipelineConfig,
    /// Player settings.
    pub player: PlayerConfig,
    /// Usage panel settings.
    pub usage: UsageConfig,
    /// Window / download settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
