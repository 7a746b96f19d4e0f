//! Speaker output via `cpal`, fed by audio fetched from the backend.
//!
//! [`CpalTransport`] implements [`Transport`]:
//!
//! ```text
//! attach(locator)
//!   ├─ resolve output device + stream config       (UI thread)
//!   └─ tokio task: fetch_audio → spawn_blocking(decode + conform)
//!         └─▶ BufferingStarted … MetadataLoaded, BufferingStopped | Failed
//!
//! play()
//!   └─ build cpal output stream on first use       (UI thread)
//!         callback: copy frames at PlayHead.cursor, scale by volume,
//!                   PositionChanged ~4×/s, Ended at the last frame
//! ```
//!
//! The stream is created lazily and dropped on detach; `cpal::Stream` is
//! not `Send`, so this type stays on the thread that owns the controller.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::runtime::Handle;

use crate::api::{AudioLocator, AudiobookBackend};

use super::decode::{decode_audio, DecodedAudio};
use super::transport::{Transport, TransportError, TransportEvent};

/// Used to decode when no output device could be resolved.
const FALLBACK_RATE: u32 = 44_100;
const FALLBACK_CHANNELS: u16 = 2;

/// Position reports per second of playback.
const POSITION_REPORTS_PER_SEC: usize = 4;

// ---------------------------------------------------------------------------
// PlayHead
// ---------------------------------------------------------------------------

/// State shared between the transport and the audio callback.
struct PlayHead {
    /// Next frame to emit.
    cursor: AtomicUsize,
    /// Cursor value at the last `PositionChanged`.
    reported: AtomicUsize,
    playing: AtomicBool,
    /// `f32` bits.
    volume: AtomicU32,
}

impl PlayHead {
    fn new(volume: f32) -> Self {
        Self {
            cursor: AtomicUsize::new(0),
            reported: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            volume: AtomicU32::new(volume.to_bits()),
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// OutputTarget
// ---------------------------------------------------------------------------

struct OutputTarget {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl OutputTarget {
    /// Resolve the named device (or the host default) and an `f32` config.
    fn open(device_name: Option<&str>) -> Result<Self, TransportError> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(wanted) => {
                let found = host
                    .output_devices()?
                    .find(|d| d.name().map(|n| n == wanted).unwrap_or(false));
                match found {
                    Some(device) => device,
                    None => {
                        log::warn!("playback: output device {wanted:?} not found, using default");
                        host.default_output_device()
                            .ok_or(TransportError::NoDevice)?
                    }
                }
            }
            None => host.default_output_device().ok_or(TransportError::NoDevice)?,
        };

        let supported = device.default_output_config()?;
        let mut config: cpal::StreamConfig = supported.config();

        if supported.sample_format() != SampleFormat::F32 {
            // Look for an f32 variant at the same rate.
            let rate = supported.sample_rate();
            let alt = device.supported_output_configs().ok().and_then(|mut configs| {
                configs.find(|c| {
                    c.sample_format() == SampleFormat::F32
                        && c.min_sample_rate() <= rate
                        && c.max_sample_rate() >= rate
                })
            });
            if let Some(alt) = alt {
                config = alt.with_sample_rate(rate).config();
            } else {
                log::warn!(
                    "playback: device prefers {:?}, f32 stream may be rejected",
                    supported.sample_format()
                );
            }
        }

        log::info!(
            "playback: output {} @ {} Hz x{}",
            device.name().unwrap_or_else(|_| "<unnamed>".into()),
            config.sample_rate.0,
            config.channels
        );

        Ok(Self { device, config })
    }
}

// ---------------------------------------------------------------------------
// CpalTransport
// ---------------------------------------------------------------------------

/// Plays audiobook audio on a cpal output device.
pub struct CpalTransport {
    backend: Arc<dyn AudiobookBackend>,
    runtime: Handle,
    device_name: Option<String>,
    target: Option<OutputTarget>,
    /// Filled by the loader task once decoding finishes.
    loaded: Arc<Mutex<Option<Arc<DecodedAudio>>>>,
    /// Bumped on every attach/detach; loaders holding an older value discard
    /// their result.
    load_token: Arc<AtomicU64>,
    head: Arc<PlayHead>,
    stream: Option<cpal::Stream>,
    events: Option<mpsc::Sender<TransportEvent>>,
}

impl CpalTransport {
    /// * `device_name` — output device to prefer; `None` uses the default.
    pub fn new(
        backend: Arc<dyn AudiobookBackend>,
        runtime: Handle,
        device_name: Option<String>,
    ) -> Self {
        Self {
            backend,
            runtime,
            device_name,
            target: None,
            loaded: Arc::new(Mutex::new(None)),
            load_token: Arc::new(AtomicU64::new(0)),
            head: Arc::new(PlayHead::new(1.0)),
            stream: None,
            events: None,
        }
    }

    fn build_stream(
        &self,
        target: &OutputTarget,
        audio: Arc<DecodedAudio>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<cpal::Stream, TransportError> {
        let head = Arc::clone(&self.head);
        let channels = audio.channels as usize;
        let total_frames = audio.frames();
        let rate = audio.sample_rate as f64;
        let report_every = (audio.sample_rate as usize / POSITION_REPORTS_PER_SEC).max(1);

        let stream = target.device.build_output_stream(
            &target.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !head.playing.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }

                let volume = head.volume();
                let mut cursor = head.cursor.load(Ordering::Relaxed);

                for frame in data.chunks_mut(channels) {
                    if cursor >= total_frames {
                        frame.fill(0.0);
                        continue;
                    }
                    let base = cursor * channels;
                    for (c, out) in frame.iter_mut().enumerate() {
                        *out = audio.samples[base + c] * volume;
                    }
                    cursor += 1;
                }

                if cursor >= total_frames {
                    head.playing.store(false, Ordering::Relaxed);
                    head.cursor.store(0, Ordering::Relaxed);
                    head.reported.store(0, Ordering::Relaxed);
                    let _ = events.send(TransportEvent::Ended);
                    return;
                }

                head.cursor.store(cursor, Ordering::Relaxed);
                let last = head.reported.load(Ordering::Relaxed);
                if cursor.abs_diff(last) >= report_every {
                    head.reported.store(cursor, Ordering::Relaxed);
                    let _ = events.send(TransportEvent::PositionChanged {
                        position_secs: cursor as f64 / rate,
                    });
                }
            },
            |err: cpal::StreamError| {
                log::error!("cpal output stream error: {err}");
            },
            None,
        )?;

        Ok(stream)
    }
}

impl Transport for CpalTransport {
    fn attach(&mut self, locator: &AudioLocator, events: mpsc::Sender<TransportEvent>) {
        self.detach();

        if self.target.is_none() {
            match OutputTarget::open(self.device_name.as_deref()) {
                Ok(target) => self.target = Some(target),
                Err(e) => log::warn!("playback: no usable output: {e}"),
            }
        }
        let (rate, channels) = self
            .target
            .as_ref()
            .map(|t| (t.config.sample_rate.0, t.config.channels))
            .unwrap_or((FALLBACK_RATE, FALLBACK_CHANNELS));

        let token = self.load_token.fetch_add(1, Ordering::SeqCst) + 1;
        self.events = Some(events.clone());

        let backend = Arc::clone(&self.backend);
        let loaded = Arc::clone(&self.loaded);
        let load_token = Arc::clone(&self.load_token);
        let locator = locator.clone();

        log::info!("playback: loading {locator}");
        self.runtime.spawn(async move {
            let _ = events.send(TransportEvent::BufferingStarted);

            let bytes = match backend.fetch_audio(&locator).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::error!("playback: fetch failed: {e}");
                    let _ = events.send(TransportEvent::Failed {
                        reason: e.user_message("loading audio"),
                    });
                    return;
                }
            };

            let decoded = tokio::task::spawn_blocking(move || {
                decode_audio(bytes).and_then(|audio| audio.conform_to(rate, channels))
            })
            .await;

            let audio = match decoded {
                Ok(Ok(audio)) => audio,
                Ok(Err(e)) => {
                    log::error!("playback: decode failed: {e}");
                    let _ = events.send(TransportEvent::Failed {
                        reason: e.to_string(),
                    });
                    return;
                }
                Err(e) => {
                    log::error!("playback: decode task failed: {e}");
                    let _ = events.send(TransportEvent::Failed {
                        reason: e.to_string(),
                    });
                    return;
                }
            };

            if load_token.load(Ordering::SeqCst) != token {
                log::debug!("playback: discarding superseded load of {locator}");
                return;
            }

            let duration_secs = audio.duration_secs();
            *loaded.lock().unwrap() = Some(Arc::new(audio));
            let _ = events.send(TransportEvent::MetadataLoaded { duration_secs });
            let _ = events.send(TransportEvent::BufferingStopped);
        });
    }

    fn detach(&mut self) {
        self.load_token.fetch_add(1, Ordering::SeqCst);
        self.stream = None;
        self.events = None;
        *self.loaded.lock().unwrap() = None;
        self.head = Arc::new(PlayHead::new(self.head.volume()));
    }

    fn play(&mut self) -> Result<(), TransportError> {
        let audio = self
            .loaded
            .lock()
            .unwrap()
            .clone()
            .ok_or(TransportError::NotReady)?;

        if self.stream.is_none() {
            let target = self.target.as_ref().ok_or(TransportError::NoDevice)?;
            let events = self.events.clone().ok_or(TransportError::NotReady)?;
            self.stream = Some(self.build_stream(target, audio, events)?);
        }

        self.head.playing.store(true, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            stream.play()?;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.head.playing.store(false, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                log::debug!("playback: stream pause not supported: {e}");
            }
        }
    }

    fn seek(&mut self, position_secs: f64) {
        let Some(audio) = self.loaded.lock().unwrap().clone() else {
            return;
        };
        let frame = (position_secs.max(0.0) * audio.sample_rate as f64) as usize;
        let frame = frame.min(audio.frames().saturating_sub(1));
        self.head.cursor.store(frame, Ordering::Relaxed);
        self.head.reported.store(frame, Ordering::Relaxed);
    }

    fn set_volume(&mut self, volume: f32) {
        self.head
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_head_volume_round_trips_through_bits() {
        let head = PlayHead::new(0.35);
        assert!((head.volume() - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn events_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<TransportEvent>();
        assert_send::<mpsc::Sender<TransportEvent>>();
    }
}
