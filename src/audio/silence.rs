//! Energy-based silence detection
//!
//! Probes fixed-length windows at millisecond offsets, stepping backwards
//! from the end of the searched range. Window energy comes from a prefix
//! sum over per-millisecond blocks so each probe is O(1).

use super::AudioBuffer;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest representable sample magnitude for normalized float audio
const MAX_AMPLITUDE: f32 = 1.0;

/// Configuration for silence detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceConfig {
    /// RMS level (dBFS) at or below which a probe counts as silent
    pub threshold_db: f32,
    /// Probe length in milliseconds
    pub min_silence_len_ms: u32,
    /// Distance between probes in milliseconds
    pub seek_step_ms: u32,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_db: -60.0,
            min_silence_len_ms: 300,
            seek_step_ms: 1,
        }
    }
}

impl SilenceConfig {
    pub fn new(threshold_db: f32, min_silence_len_ms: u32) -> Self {
        Self {
            threshold_db,
            min_silence_len_ms,
            ..Default::default()
        }
    }
}

/// A silent probe, in milliseconds relative to the searched range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Convert decibels to a linear amplitude ratio
pub fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Frame offset of a millisecond position
pub fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

/// Find silent probes in the frames `[start, end)` of `audio`
///
/// Returned ranges are ordered from the latest probe to the earliest.
pub fn detect_silence(
    audio: &AudioBuffer,
    start: usize,
    end: usize,
    config: &SilenceConfig,
) -> Vec<SilenceRange> {
    if audio.sample_rate == 0 {
        return Vec::new();
    }
    let end = end.min(audio.frames());
    let start = start.min(end);
    let rate = audio.sample_rate;

    let segment_ms = ((end - start) as u64 * 1000 / rate as u64) as usize;
    let probe_ms = config.min_silence_len_ms.max(1) as usize;
    if segment_ms < probe_ms {
        return Vec::new();
    }

    let threshold = db_to_amplitude(config.threshold_db) * MAX_AMPLITUDE;
    let frame_at = |ms: usize| start + ms_to_frames(ms as u64, rate);

    // prefix[k] = sum of squares over the first k milliseconds
    let mut prefix = Vec::with_capacity(segment_ms + 1);
    prefix.push(0.0f64);
    let mut total = 0.0f64;
    for ms in 0..segment_ms {
        total += audio
            .frame_samples(frame_at(ms), frame_at(ms + 1))
            .iter()
            .map(|&s| (s as f64) * (s as f64))
            .sum::<f64>();
        prefix.push(total);
    }

    let channels = audio.channels as usize;
    let last_start = segment_ms - probe_ms;
    let step = config.seek_step_ms.max(1) as usize;
    let mut ranges = Vec::new();

    for offset in (0..=last_start).rev().step_by(step) {
        let count = (frame_at(offset + probe_ms) - frame_at(offset)) * channels;
        let energy = prefix[offset + probe_ms] - prefix[offset];
        let rms = if count == 0 {
            0.0
        } else {
            (energy / count as f64).sqrt() as f32
        };
        if rms <= threshold {
            ranges.push(SilenceRange {
                start_ms: offset as u64,
                end_ms: (offset + probe_ms) as u64,
            });
        }
    }

    debug!(
        "Silence scan over {}ms: {} silent probes (threshold {:.5})",
        segment_ms,
        ranges.len(),
        threshold
    );

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn loud(seconds: f32) -> Vec<f32> {
        vec![0.5; (seconds * RATE as f32) as usize]
    }

    fn quiet(seconds: f32) -> Vec<f32> {
        vec![0.0; (seconds * RATE as f32) as usize]
    }

    #[test]
    fn test_db_to_amplitude() {
        assert!((db_to_amplitude(-60.0) - 0.001).abs() < 1e-7);
        assert!((db_to_amplitude(0.0) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_detects_pause() {
        let mut samples = loud(1.0);
        samples.extend(quiet(0.5));
        samples.extend(loud(1.0));
        let audio = AudioBuffer::mono(samples, RATE);

        let ranges = detect_silence(&audio, 0, audio.frames(), &SilenceConfig::default());
        let starts: Vec<u64> = ranges.iter().map(|r| r.start_ms).collect();

        // Probes fully inside the pause start at 1000..=1200ms, latest first
        assert_eq!(starts.first(), Some(&1200));
        assert_eq!(starts.last(), Some(&1000));
        assert_eq!(starts.len(), 201);
        assert!(ranges.iter().all(|r| r.end_ms - r.start_ms == 300));
    }

    #[test]
    fn test_offsets_are_relative_to_range_start() {
        let mut samples = loud(1.0);
        samples.extend(quiet(0.5));
        samples.extend(loud(1.0));
        let audio = AudioBuffer::mono(samples, RATE);

        let ranges = detect_silence(
            &audio,
            RATE as usize,
            audio.frames(),
            &SilenceConfig::default(),
        );
        assert_eq!(ranges.last().map(|r| r.start_ms), Some(0));
        assert_eq!(ranges.first().map(|r| r.start_ms), Some(200));
    }

    #[test]
    fn test_continuous_signal_has_no_silence() {
        let audio = AudioBuffer::mono(loud(2.0), RATE);
        assert!(detect_silence(&audio, 0, audio.frames(), &SilenceConfig::default()).is_empty());
    }

    #[test]
    fn test_short_range_has_no_probes() {
        let audio = AudioBuffer::mono(quiet(0.2), RATE);
        assert!(detect_silence(&audio, 0, audio.frames(), &SilenceConfig::default()).is_empty());
    }

    #[test]
    fn test_stereo_energy_uses_all_channels() {
        // Left channel silent, right channel loud: not silence
        let samples: Vec<f32> = (0..RATE as usize).flat_map(|_| [0.0, 0.5]).collect();
        let audio = AudioBuffer::new(samples, 2, RATE);
        assert!(detect_silence(&audio, 0, audio.frames(), &SilenceConfig::default()).is_empty());
    }
}
