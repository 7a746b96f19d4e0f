//! Playback state and the commands the player widget issues.
//!
//! [`PlaybackController`] owns a [`Transport`] and the receiving end of its
//! event channel.  All state changes driven by the transport go through
//! [`PlaybackController::handle_event`]; user commands call into the
//! transport and only touch the fields they own (volume, mute).

use std::sync::mpsc;

use crate::api::AudioLocator;

use super::transport::{Transport, TransportEvent};

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// What the player renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub position_secs: f64,
    pub duration_secs: f64,
    pub is_playing: bool,
    /// Slider value in `[0, 1]`.
    pub volume: f32,
    pub is_muted: bool,
    pub is_buffering: bool,
}

impl PlaybackState {
    fn new(volume: f32) -> Self {
        Self {
            position_secs: 0.0,
            duration_secs: 0.0,
            is_playing: false,
            volume,
            is_muted: volume == 0.0,
            is_buffering: false,
        }
    }

    /// `position / duration`, or 0 while the duration is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.duration_secs.is_finite() && self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Volume actually sent to the transport.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

pub struct PlaybackController<T: Transport> {
    transport: T,
    state: PlaybackState,
    locator: Option<AudioLocator>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    /// Last non-zero volume, restored on unmute.
    restore_volume: f32,
}

impl<T: Transport> PlaybackController<T> {
    /// * `initial_volume` — clamped to `[0, 1]`.
    pub fn new(mut transport: T, initial_volume: f32) -> Self {
        let volume = clamp_volume(initial_volume);
        let state = PlaybackState::new(volume);
        transport.set_volume(state.effective_volume());
        Self {
            transport,
            state,
            locator: None,
            events: None,
            restore_volume: if volume > 0.0 { volume } else { 1.0 },
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn locator(&self) -> Option<&AudioLocator> {
        self.locator.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Point the player at `locator`, or unload it with `None`.
    ///
    /// Loading the locator already attached is a no-op.  Otherwise the old
    /// attachment is detached (its pending events are dropped), position and
    /// duration are reset, and volume/mute carry over.
    pub fn load(&mut self, locator: Option<AudioLocator>) {
        if self.locator == locator {
            return;
        }

        if self.locator.take().is_some() {
            self.transport.detach();
        }
        self.events = None;

        let volume = self.state.volume;
        let is_muted = self.state.is_muted;
        self.state = PlaybackState {
            volume,
            is_muted,
            ..PlaybackState::new(volume)
        };

        if let Some(locator) = locator {
            let (tx, rx) = mpsc::channel();
            self.transport.attach(&locator, tx);
            self.transport.set_volume(self.state.effective_volume());
            self.state.is_buffering = true;
            self.events = Some(rx);
            self.locator = Some(locator);
        }
    }

    /// Apply every event the transport has sent since the last call.
    /// Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let Some(rx) = &self.events else {
            return 0;
        };
        let pending: Vec<TransportEvent> = rx.try_iter().collect();
        let n = pending.len();
        for event in pending {
            self.handle_event(event);
        }
        n
    }

    /// The single place transport-derived fields change.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::MetadataLoaded { duration_secs } => {
                self.state.duration_secs = if duration_secs.is_finite() && duration_secs > 0.0 {
                    duration_secs
                } else {
                    0.0
                };
                self.state.position_secs = self.state.position_secs.min(self.state.duration_secs);
                self.state.is_buffering = false;
            }
            TransportEvent::PositionChanged { position_secs } => {
                if position_secs.is_finite() {
                    self.state.position_secs =
                        position_secs.clamp(0.0, self.state.duration_secs.max(0.0));
                }
            }
            TransportEvent::Ended => {
                self.state.is_playing = false;
                self.state.position_secs = 0.0;
            }
            TransportEvent::BufferingStarted => self.state.is_buffering = true,
            TransportEvent::BufferingStopped => self.state.is_buffering = false,
            TransportEvent::Failed { reason } => {
                log::warn!("playback: {reason}");
                self.state.is_buffering = false;
                self.state.is_playing = false;
            }
        }
    }

    /// Pause when playing, otherwise start.  A rejected start is logged and
    /// leaves the player paused.
    pub fn toggle_play_pause(&mut self) {
        if self.locator.is_none() {
            return;
        }

        if self.state.is_playing {
            self.transport.pause();
            self.state.is_playing = false;
            return;
        }

        match self.transport.play() {
            Ok(()) => self.state.is_playing = true,
            Err(e) => {
                log::warn!("playback: could not start: {e}");
                self.state.is_playing = false;
            }
        }
    }

    /// Seek to `fraction` of the duration, clamped to `[0, 1]`.  Ignored while
    /// the duration is unknown.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        let duration = self.state.duration_secs;
        if fraction.is_nan() || !duration.is_finite() || duration <= 0.0 {
            return;
        }
        self.seek_to(fraction.clamp(0.0, 1.0) * duration);
    }

    /// Move by `delta_secs` (negative rewinds), clamped to `[0, duration]`.
    pub fn skip(&mut self, delta_secs: f64) {
        let duration = self.state.duration_secs;
        if delta_secs.is_nan() || !duration.is_finite() || duration <= 0.0 {
            return;
        }
        self.seek_to((self.state.position_secs + delta_secs).clamp(0.0, duration));
    }

    fn seek_to(&mut self, position_secs: f64) {
        self.transport.seek(position_secs);
        self.state.position_secs = position_secs;
    }

    /// Set the slider volume.  Zero mutes; anything above unmutes and becomes
    /// the volume restored by the next unmute.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.state.volume = volume;
        if volume > 0.0 {
            self.restore_volume = volume;
            self.state.is_muted = false;
        } else {
            self.state.is_muted = true;
        }
        self.transport.set_volume(self.state.effective_volume());
    }

    /// Mute keeps the slider where it is; unmute restores the last non-zero
    /// volume.
    pub fn toggle_mute(&mut self) {
        if self.state.is_muted {
            self.state.is_muted = false;
            if self.state.volume <= 0.0 {
                self.state.volume = self.restore_volume;
            }
        } else {
            self.state.is_muted = true;
        }
        self.transport.set_volume(self.state.effective_volume());
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// `m:ss`, with anything non-finite or negative shown as `0:00`.
///
/// ```
/// use pdf_audiobook::playback::format_time;
///
/// assert_eq!(format_time(75.4), "1:15");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".into();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Fraction of a horizontal track under the pointer, clamped to `[0, 1]`.
/// `None` for a track with no width.
pub fn fraction_from_pointer(pointer_x: f32, track_left: f32, track_width: f32) -> Option<f64> {
    if track_width.is_nan() || track_width <= 0.0 || !pointer_x.is_finite() {
        return None;
    }
    Some((((pointer_x - track_left) / track_width) as f64).clamp(0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::mock::{Call, MockTransport};

    fn loaded(duration: f64) -> PlaybackController<MockTransport> {
        let mut c = PlaybackController::new(MockTransport::default(), 1.0);
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));
        c.handle_event(TransportEvent::MetadataLoaded {
            duration_secs: duration,
        });
        c.handle_event(TransportEvent::BufferingStopped);
        c
    }

    // ---- load --------------------------------------------------------------

    #[test]
    fn load_attaches_and_starts_buffering() {
        let mut c = PlaybackController::new(MockTransport::default(), 1.0);
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));

        assert!(c.state().is_buffering);
        assert_eq!(
            c.transport().calls[1],
            Call::Attach("http://backend.test/a.mp3".into())
        );
    }

    #[test]
    fn loading_same_locator_twice_is_noop() {
        let mut c = loaded(100.0);
        let before = c.transport().calls.len();
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));
        assert_eq!(c.transport().calls.len(), before);
        assert_eq!(c.state().duration_secs, 100.0);
    }

    #[test]
    fn reload_resets_position_but_keeps_volume_and_mute() {
        let mut c = loaded(100.0);
        c.set_volume(0.4);
        c.toggle_mute();
        c.handle_event(TransportEvent::PositionChanged { position_secs: 30.0 });

        c.load(Some(AudioLocator::new("http://backend.test/b.mp3")));

        let s = c.state();
        assert_eq!(s.position_secs, 0.0);
        assert_eq!(s.duration_secs, 0.0);
        assert!(!s.is_playing);
        assert!((s.volume - 0.4).abs() < f32::EPSILON);
        assert!(s.is_muted);
        assert_eq!(c.transport().last_volume(), Some(0.0));
        assert!(c.transport().calls.contains(&Call::Detach));
    }

    #[test]
    fn events_from_previous_locator_are_dropped() {
        let mut c = loaded(100.0);
        let stale = c.transport().sender.clone().unwrap();

        c.load(Some(AudioLocator::new("http://backend.test/b.mp3")));
        let _ = stale.send(TransportEvent::MetadataLoaded { duration_secs: 999.0 });

        c.pump();
        assert_eq!(c.state().duration_secs, 0.0);
    }

    #[test]
    fn unload_detaches() {
        let mut c = loaded(100.0);
        c.load(None);
        assert!(c.locator().is_none());
        assert_eq!(c.transport().calls.last(), Some(&Call::Detach));
        assert_eq!(c.pump(), 0);
    }

    // ---- events ------------------------------------------------------------

    #[test]
    fn pump_applies_events_in_order() {
        let mut c = PlaybackController::new(MockTransport::default(), 1.0);
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));

        c.transport().emit(TransportEvent::BufferingStarted);
        c.transport().emit(TransportEvent::MetadataLoaded { duration_secs: 95.0 });
        c.transport().emit(TransportEvent::BufferingStopped);
        c.transport().emit(TransportEvent::PositionChanged { position_secs: 12.5 });

        assert_eq!(c.pump(), 4);
        let s = c.state();
        assert_eq!(s.duration_secs, 95.0);
        assert_eq!(s.position_secs, 12.5);
        assert!(!s.is_buffering);
    }

    #[test]
    fn position_is_clamped_to_duration() {
        let mut c = loaded(50.0);
        c.handle_event(TransportEvent::PositionChanged { position_secs: 80.0 });
        assert_eq!(c.state().position_secs, 50.0);
        c.handle_event(TransportEvent::PositionChanged { position_secs: -3.0 });
        assert_eq!(c.state().position_secs, 0.0);
    }

    #[test]
    fn ended_rewinds_and_stops() {
        let mut c = loaded(50.0);
        c.toggle_play_pause();
        c.handle_event(TransportEvent::PositionChanged { position_secs: 49.0 });
        c.handle_event(TransportEvent::Ended);

        assert!(!c.state().is_playing);
        assert_eq!(c.state().position_secs, 0.0);
    }

    #[test]
    fn failure_clears_buffering() {
        let mut c = PlaybackController::new(MockTransport::default(), 1.0);
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));
        c.handle_event(TransportEvent::Failed {
            reason: "decode failed".into(),
        });
        assert!(!c.state().is_buffering);
        assert!(!c.state().is_playing);
    }

    #[test]
    fn non_finite_duration_reads_as_unknown() {
        let mut c = loaded(f64::INFINITY);
        assert_eq!(c.state().duration_secs, 0.0);
        c.seek_to_fraction(0.5);
        assert!(!c.transport().calls.iter().any(|x| matches!(x, Call::Seek(_))));
    }

    // ---- play / pause ------------------------------------------------------

    #[test]
    fn toggle_play_pause_alternates() {
        let mut c = loaded(50.0);
        c.toggle_play_pause();
        assert!(c.state().is_playing);
        c.toggle_play_pause();
        assert!(!c.state().is_playing);
        assert!(c.transport().calls.ends_with(&[Call::Play, Call::Pause]));
    }

    #[test]
    fn rejected_play_stays_paused() {
        let mut c = PlaybackController::new(
            MockTransport {
                reject_play: true,
                ..MockTransport::default()
            },
            1.0,
        );
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));
        c.toggle_play_pause();
        assert!(!c.state().is_playing);
    }

    #[test]
    fn play_without_locator_does_nothing() {
        let mut c = PlaybackController::new(MockTransport::default(), 1.0);
        c.toggle_play_pause();
        assert!(!c.state().is_playing);
        assert!(!c.transport().calls.contains(&Call::Play));
    }

    // ---- seek / skip -------------------------------------------------------

    #[test]
    fn seek_to_fraction_scales_duration() {
        let mut c = loaded(200.0);
        c.seek_to_fraction(0.25);
        assert_eq!(c.state().position_secs, 50.0);
        assert_eq!(c.transport().calls.last(), Some(&Call::Seek(50.0)));
    }

    #[test]
    fn seek_to_fraction_clamps() {
        let mut c = loaded(200.0);
        c.seek_to_fraction(1.7);
        assert_eq!(c.state().position_secs, 200.0);
        c.seek_to_fraction(-0.2);
        assert_eq!(c.state().position_secs, 0.0);
    }

    #[test]
    fn seek_before_metadata_is_ignored() {
        let mut c = PlaybackController::new(MockTransport::default(), 1.0);
        c.load(Some(AudioLocator::new("http://backend.test/a.mp3")));
        c.seek_to_fraction(0.5);
        c.seek_to_fraction(f64::NAN);
        assert!(!c.transport().calls.iter().any(|x| matches!(x, Call::Seek(_))));
    }

    #[test]
    fn skip_clamps_to_bounds() {
        let mut c = loaded(30.0);
        c.handle_event(TransportEvent::PositionChanged { position_secs: 25.0 });
        c.skip(10.0);
        assert_eq!(c.state().position_secs, 30.0);
        c.skip(-100.0);
        assert_eq!(c.state().position_secs, 0.0);
    }

    // ---- volume / mute -----------------------------------------------------

    #[test]
    fn zero_volume_mutes() {
        let mut c = loaded(30.0);
        c.set_volume(0.0);
        assert!(c.state().is_muted);
        assert_eq!(c.transport().last_volume(), Some(0.0));
    }

    #[test]
    fn volume_is_clamped() {
        let mut c = loaded(30.0);
        c.set_volume(1.8);
        assert_eq!(c.state().volume, 1.0);
        c.set_volume(f32::NAN);
        assert_eq!(c.state().volume, 0.0);
        assert!(c.state().is_muted);
    }

    #[test]
    fn mute_then_unmute_restores_volume() {
        let mut c = loaded(30.0);
        c.set_volume(0.6);
        c.toggle_mute();
        assert!(c.state().is_muted);
        assert!((c.state().volume - 0.6).abs() < f32::EPSILON);
        assert_eq!(c.transport().last_volume(), Some(0.0));

        c.toggle_mute();
        assert!(!c.state().is_muted);
        assert_eq!(c.transport().last_volume(), Some(0.6));
    }

    #[test]
    fn unmute_after_dragging_to_zero_restores_last_audible_volume() {
        let mut c = loaded(30.0);
        c.set_volume(0.7);
        c.set_volume(0.0);
        c.toggle_mute();
        assert!(!c.state().is_muted);
        assert!((c.state().volume - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn raising_volume_unmutes() {
        let mut c = loaded(30.0);
        c.toggle_mute();
        c.set_volume(0.3);
        assert!(!c.state().is_muted);
        assert_eq!(c.transport().last_volume(), Some(0.3));
    }

    // ---- helpers -----------------------------------------------------------

    #[test]
    fn progress_fraction_guards_unknown_duration() {
        let mut s = PlaybackState::new(1.0);
        assert_eq!(s.progress_fraction(), 0.0);
        s.duration_secs = 80.0;
        s.position_secs = 20.0;
        assert_eq!(s.progress_fraction(), 0.25);
    }

    #[test]
    fn format_time_cases() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.99), "0:59");
        assert_eq!(format_time(60.0), "1:00");
        assert_eq!(format_time(3_725.0), "62:05");
        assert_eq!(format_time(-4.0), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    #[test]
    fn fraction_from_pointer_clamps_and_rejects_empty_track() {
        assert_eq!(fraction_from_pointer(150.0, 100.0, 200.0), Some(0.25));
        assert_eq!(fraction_from_pointer(50.0, 100.0, 200.0), Some(0.0));
        assert_eq!(fraction_from_pointer(400.0, 100.0, 200.0), Some(1.0));
        assert_eq!(fraction_from_pointer(150.0, 100.0, 0.0), None);
    }
}
