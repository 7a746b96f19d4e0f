//! Whole-file decoding of fetched audio bytes via symphonia.
//!
//! The audiobook arrives as one MP3 blob; it is decoded up front into
//! interleaved `f32` so seeking is just moving an index.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use super::resample::{remix_channels, resample_interleaved, ResampleError};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognised audio format: {0}")]
    Probe(String),

    #[error("no audio track found")]
    NoTrack,

    #[error("unsupported codec: {0}")]
    Codec(String),

    #[error("audio stream contained no samples")]
    Empty,

    #[error(transparent)]
    Resample(#[from] ResampleError),
}

/// Decoded PCM, interleaved.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Convert to the given output rate and channel count.
    pub fn conform_to(self, sample_rate: u32, channels: u16) -> Result<DecodedAudio, DecodeError> {
        if self.sample_rate == sample_rate && self.channels == channels {
            return Ok(self);
        }
        let remixed = remix_channels(&self.samples, self.channels, channels);
        let samples = resample_interleaved(&remixed, channels, self.sample_rate, sample_rate)?;
        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels,
        })
    }
}

/// Decode a complete audio file held in memory.
///
/// Corrupt packets are skipped with a warning; a read error other than end of
/// stream ends decoding with whatever was produced so far.
pub fn decode_audio(bytes: Vec<u8>) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count() as u16);
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::warn!("decode: stopping at unreadable packet: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("decode: skipping corrupt packet: {e}");
            }
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        }
    }

    match (sample_rate, channels) {
        (Some(sample_rate), Some(channels)) if !samples.is_empty() && channels > 0 => {
            let audio = DecodedAudio {
                samples,
                sample_rate,
                channels,
            };
            log::debug!(
                "decode: {} frames @ {} Hz x{} ({:.1}s)",
                audio.frames(),
                audio.sample_rate,
                audio.channels,
                audio.duration_secs()
            );
            Ok(audio)
        }
        _ => Err(DecodeError::Empty),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit PCM WAV, mono, constant sample value.
    fn wav_bytes(sample_rate: u32, frames: usize, value: i16) -> Vec<u8> {
        let data_len = (frames * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for _ in 0..frames {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_pcm_wav() {
        let audio = decode_audio(wav_bytes(8_000, 4_000, 16_384)).unwrap();
        assert_eq!(audio.sample_rate, 8_000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.frames(), 4_000);
        assert!((audio.duration_secs() - 0.5).abs() < 1e-9);
        assert!((audio.samples[100] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = decode_audio(b"definitely not audio".to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::Probe(_)), "got {err:?}");
    }

    #[test]
    fn conform_to_output_format() {
        let audio = DecodedAudio {
            samples: vec![0.25; 24_000],
            sample_rate: 24_000,
            channels: 1,
        };
        let out = audio.conform_to(48_000, 2).unwrap();
        assert_eq!(out.channels, 2);
        assert_eq!(out.sample_rate, 48_000);
        assert_eq!(out.frames(), 48_000);
        assert!((out.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn conform_to_same_format_is_identity() {
        let audio = DecodedAudio {
            samples: vec![0.1, 0.2],
            sample_rate: 44_100,
            channels: 2,
        };
        let out = audio.conform_to(44_100, 2).unwrap();
        assert_eq!(out.samples, vec![0.1, 0.2]);
    }
}
