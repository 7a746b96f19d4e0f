//! Transient user-facing status messages.
//!
//! [`StatusNotifier`] holds at most one [`StatusMessage`].  Showing a new
//! message replaces the current one and restarts its five-second lifetime;
//! nothing is queued.  Expiry is evaluated lazily against the caller's clock,
//! so the UI simply asks for [`StatusNotifier::current`] every frame and tests
//! drive time through the `*_at` variants.
//!
//! [`SharedNotifier`] is the `Arc<Mutex<…>>` handle shared by the pipeline
//! tasks (writers) and the egui update loop (reader).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long a message stays visible.
pub const STATUS_LIFETIME: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// StatusKind / StatusMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub created_at: Instant,
}

impl StatusMessage {
    /// Instant after which the message is no longer shown.
    pub fn expires_at(&self) -> Instant {
        self.created_at + STATUS_LIFETIME
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

// ---------------------------------------------------------------------------
// StatusNotifier
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StatusNotifier {
    current: Option<StatusMessage>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is showing with `text`, starting a fresh lifetime now.
    pub fn show(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.show_at(text, kind, Instant::now());
    }

    /// [`show`](Self::show) with an explicit clock reading.
    pub fn show_at(&mut self, text: impl Into<String>, kind: StatusKind, now: Instant) {
        let text = text.into();
        match kind {
            StatusKind::Error => log::warn!("status: {text}"),
            _ => log::info!("status: {text}"),
        }
        self.current = Some(StatusMessage {
            text,
            kind,
            created_at: now,
        });
    }

    /// The visible message, if any.
    pub fn current(&mut self) -> Option<&StatusMessage> {
        self.current_at(Instant::now())
    }

    /// The message visible at `now`.  An expired message is dropped.
    pub fn current_at(&mut self, now: Instant) -> Option<&StatusMessage> {
        if self
            .current
            .as_ref()
            .is_some_and(|msg| msg.is_expired_at(now))
        {
            self.current = None;
        }
        self.current.as_ref()
    }

    /// Dismiss the current message immediately.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Thread-safe handle to a [`StatusNotifier`].
pub type SharedNotifier = Arc<Mutex<StatusNotifier>>;

pub fn new_shared_notifier() -> SharedNotifier {
    Arc::new(Mutex::new(StatusNotifier::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
