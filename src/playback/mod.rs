//! Audio player for the generated audiobook.
//!
//! # Architecture
//!
//! ```text
//! PipelineSnapshot.audio (AudioLocator)
//!        │ load()
//!        ▼
//! PlaybackController<T: Transport>  ← owned by the UI, pumped every frame
//!        │  commands: play/pause, seek, skip, volume, mute
//!        ▼
//! CpalTransport
//!        ├─ tokio: fetch_audio → decode (symphonia) → conform (rubato)
//!        └─ cpal output stream ──TransportEvent (mpsc)──▶ controller
//! ```

pub mod controller;
pub mod decode;
#[cfg(test)]
pub(crate) mod mock;
pub mod output;
pub mod resample;
pub mod transport;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{format_time, fraction_from_pointer, PlaybackController, PlaybackState};
pub use decode::{decode_audio, DecodeError, DecodedAudio};
pub use output::CpalTransport;
pub use resample::{remix_channels, resample_interleaved, ResampleError};
pub use transport::{Transport, TransportError, TransportEvent};
