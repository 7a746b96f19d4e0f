//! The seam between [`PlaybackController`](super::PlaybackController) and
//! whatever actually produces sound.
//!
//! A transport is attached to one [`AudioLocator`] at a time and reports what
//! happens to it as [`TransportEvent`]s over an mpsc channel.  The controller
//! owns the receiving end; dropping it (on detach) silences every sender from
//! the previous attachment.

use std::sync::mpsc;

use thiserror::Error;

use crate::api::AudioLocator;

/// Everything a transport can tell the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Duration is known and the audio can be played.
    MetadataLoaded { duration_secs: f64 },
    /// Playback head moved.
    PositionChanged { position_secs: f64 },
    /// Reached the end; the head is back at zero.
    Ended,
    BufferingStarted,
    BufferingStopped,
    /// Loading or decoding failed; nothing will play.
    Failed { reason: String },
}

/// Errors a transport can return for a transport command.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("audio is still loading")]
    NotReady,

    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// An audio sink bound to at most one locator.
///
/// Not required to be `Send`: the controller and its transport live on the
/// UI thread (`cpal::Stream` is not `Send` on every platform).
pub trait Transport {
    /// Start loading `locator`, reporting progress on `events`.
    fn attach(&mut self, locator: &AudioLocator, events: mpsc::Sender<TransportEvent>);

    /// Stop and forget the current locator.  No events for it are sent after
    /// this returns.
    fn detach(&mut self);

    /// Begin or resume playback.
    fn play(&mut self) -> Result<(), TransportError>;

    fn pause(&mut self);

    fn seek(&mut self, position_secs: f64);

    /// `volume` is already clamped to `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
}
