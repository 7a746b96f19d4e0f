//! Sample-rate and channel conversion for decoded audio.
//!
//! The decoder hands back whatever the file was encoded at (commonly 24 kHz
//! mono for synthesized speech); the output device wants its own rate and
//! channel count.  Both conversions work on interleaved `f32`:
//!
//! 1. [`remix_channels`] — fold or spread channels.
//! 2. [`resample_interleaved`] — change rate with rubato.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use thiserror::Error;

// ---------------------------------------------------------------------------
// remix_channels
// ---------------------------------------------------------------------------

/// Convert interleaved audio from `from` channels to `to` channels.
///
/// * Equal counts copy the input.
/// * Folding to mono averages each frame.
/// * Spreading mono duplicates the sample into every output channel.
/// * Any other combination maps output channel `c` to input channel
///   `c % from`.
/// * A zero on either side yields an empty vector.
///
/// ```rust
/// use pdf_audiobook::playback::remix_channels;
///
/// let mono = vec![0.25_f32, -0.5];
/// assert_eq!(remix_channels(&mono, 1, 2), vec![0.25, 0.25, -0.5, -0.5]);
///
/// let stereo = vec![1.0_f32, 0.0];
/// assert_eq!(remix_channels(&stereo, 2, 1), vec![0.5]);
/// ```
pub fn remix_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == 0 || to == 0 {
        return Vec::new();
    }
    if from == to {
        return samples.to_vec();
    }

    let from = from as usize;
    let to = to as usize;
    let frames = samples.chunks_exact(from);

    if to == 1 {
        return frames
            .map(|frame| frame.iter().sum::<f32>() / from as f32)
            .collect();
    }

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in frames {
        for c in 0..to {
            out.push(frame[c % from]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// resample_interleaved
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("failed to create resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Resample interleaved audio from `source_rate` to `target_rate` Hz.
///
/// The whole clip goes through one rubato `FastFixedIn` pass (septic
/// polynomial).  The resampler's output delay is trimmed from the front and
/// the result is padded or cut to exactly
/// `ceil(frames * target_rate / source_rate)` frames, so durations stay
/// exact.  Equal rates return a copy.
///
/// ```rust
/// use pdf_audiobook::playback::resample_interleaved;
///
/// # fn main() -> Result<(), pdf_audiobook::playback::ResampleError> {
/// // 240 stereo frames at 24 kHz become 480 frames at 48 kHz.
/// let input = vec![0.5_f32; 480];
/// let out = resample_interleaved(&input, 2, 24_000, 48_000)?;
/// assert_eq!(out.len(), 960);
/// # Ok(())
/// # }
/// ```
pub fn resample_interleaved(
    samples: &[f32],
    channels: u16,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let channels = channels as usize;
    if channels == 0 || source_rate == 0 || target_rate == 0 || samples.len() < channels {
        return Ok(Vec::new());
    }

    let planar = deinterleave(samples, channels);
    let frames = planar[0].len();
    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (frames as f64 * ratio).ceil() as usize;

    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, frames, channels)?;
    let delay = resampler.output_delay();
    let mut planar_out = resampler.process(&planar, None)?;

    for channel in &mut planar_out {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }

    log::debug!(
        "resampled {frames} frames at {source_rate} Hz to {expected} frames at {target_rate} Hz \
         ({channels} ch, delay {delay})"
    );

    Ok(interleave(&planar_out, expected))
}

/// `[L, R, L, R, …]` → `[[L, L, …], [R, R, …]]`.  A trailing partial frame is
/// dropped.
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (c, &sample) in frame.iter().enumerate() {
            planar[c].push(sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>], frames: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            out.push(channel[i]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- remix_channels ----------------------------------------------------

    #[test]
    fn remix_same_count_is_copy() {
        let input = vec![0.1_f32, 0.2, 0.3, 0.4];
        assert_eq!(remix_channels(&input, 2, 2), input);
    }

    #[test]
    fn remix_stereo_to_mono_averages() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5];
        let out = remix_channels(&input, 2, 1);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn remix_mono_to_stereo_duplicates() {
        let out = remix_channels(&[0.3_f32, 0.6], 1, 2);
        assert_eq!(out, vec![0.3, 0.3, 0.6, 0.6]);
    }

    #[test]
    fn remix_stereo_to_quad_wraps_channels() {
        let out = remix_channels(&[0.1_f32, 0.2], 2, 4);
        assert_eq!(out, vec![0.1, 0.2, 0.1, 0.2]);
    }

    #[test]
    fn remix_zero_channels_is_empty() {
        assert!(remix_channels(&[1.0_f32, 2.0], 0, 2).is_empty());
        assert!(remix_channels(&[1.0_f32, 2.0], 2, 0).is_empty());
    }

    // ---- resample_interleaved ----------------------------------------------

    #[test]
    fn resample_same_rate_is_noop() {
        let input: Vec<f32> = (0..96).map(|i| i as f32 / 96.0).collect();
        assert_eq!(resample_interleaved(&input, 2, 48_000, 48_000).unwrap(), input);
    }

    #[test]
    fn resample_empty_input() {
        assert!(resample_interleaved(&[], 1, 24_000, 48_000).unwrap().is_empty());
    }

    #[test]
    fn resample_zero_rate_or_channels_is_empty() {
        assert!(resample_interleaved(&[0.5; 8], 0, 24_000, 48_000).unwrap().is_empty());
        assert!(resample_interleaved(&[0.5; 8], 1, 0, 48_000).unwrap().is_empty());
    }

    #[test]
    fn resample_44100_to_48000_frame_count() {
        // One second of mono audio.
        let input = vec![0.0_f32; 44_100];
        let out = resample_interleaved(&input, 1, 44_100, 48_000).unwrap();
        assert_eq!(out.len(), 48_000);
    }

    #[test]
    fn resample_downsample_frame_count() {
        let input = vec![0.0_f32; 2 * 48_000];
        let out = resample_interleaved(&input, 2, 48_000, 22_050).unwrap();
        assert_eq!(out.len(), 2 * 22_050);
    }

    #[test]
    fn resample_keeps_channels_separate() {
        // Left is constant 1.0, right constant -1.0.
        let input: Vec<f32> = (0..2_000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = resample_interleaved(&input, 2, 24_000, 48_000).unwrap();
        assert_eq!(out.len(), 4_000);
        // Edges see the resampler's silent history and padding.
        for frame in out.chunks_exact(2).skip(64).take(1_800) {
            assert!((frame[0] - 1.0).abs() < 1e-3, "left {}", frame[0]);
            assert!((frame[1] + 1.0).abs() < 1e-3, "right {}", frame[1]);
        }
    }

    #[test]
    fn resample_preserves_waveform_timing() {
        // 50 Hz sine, 24 kHz -> 48 kHz; output frame i sits at t = i / 48000.
        let tone = |t: f64| (2.0 * std::f64::consts::PI * 50.0 * t).sin() as f32;
        let input: Vec<f32> = (0..4_800).map(|i| tone(i as f64 / 24_000.0)).collect();
        let out = resample_interleaved(&input, 1, 24_000, 48_000).unwrap();
        assert_eq!(out.len(), 9_600);
        for i in (200..9_400).step_by(97) {
            let want = tone(i as f64 / 48_000.0);
            assert!((out[i] - want).abs() < 0.05, "frame {i}: {} vs {want}", out[i]);
        }
    }
}
