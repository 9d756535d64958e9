//! Vocal isolation seam
//!
//! Separation itself is delegated to an external backend behind
//! [`VocalSeparator`]. This module only judges what a separation produced.

use super::AudioBuffer;
use crate::error::{AppError, Result};
use tracing::info;

/// Mean absolute vocal level above which the clip counts as containing voice
const VOCAL_PRESENCE_LEVEL: f32 = 0.01;
/// Accompaniment below this fraction of the vocal level means "vocals only"
const ACCOMPANIMENT_RATIO: f32 = 0.1;

/// Stems produced by a separation backend
#[derive(Debug, Clone)]
pub struct Separation {
    pub vocals: AudioBuffer,
    pub accompaniment: AudioBuffer,
}

/// Trait for vocal isolation backends
pub trait VocalSeparator {
    /// Short backend identifier used in logs
    fn name(&self) -> &str;

    /// Split a mix into vocal and accompaniment stems
    ///
    /// Both stems must have the input's length and sample rate.
    fn separate(&self, audio: &AudioBuffer) -> Result<Separation>;
}

/// Treats the whole input as the vocal stem
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSeparator;

impl VocalSeparator for PassthroughSeparator {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn separate(&self, audio: &AudioBuffer) -> Result<Separation> {
        Ok(Separation {
            vocals: audio.clone(),
            accompaniment: AudioBuffer::new(
                vec![0.0; audio.samples.len()],
                audio.channels,
                audio.sample_rate,
            ),
        })
    }
}

/// Run `separator` and check its output against the input format
///
/// Any failure is reported as [`AppError::UpstreamSeparation`].
pub fn run_separation(separator: &dyn VocalSeparator, audio: &AudioBuffer) -> Result<Separation> {
    let separation = separator.separate(audio).map_err(|e| match e {
        AppError::UpstreamSeparation(_) => e,
        other => AppError::UpstreamSeparation(format!("{}: {}", separator.name(), other)),
    })?;

    for (stem, buffer) in [
        ("vocals", &separation.vocals),
        ("accompaniment", &separation.accompaniment),
    ] {
        if buffer.sample_rate != audio.sample_rate || buffer.frames() != audio.frames() {
            return Err(AppError::UpstreamSeparation(format!(
                "{}: {} stem is {} frames at {}Hz, expected {} frames at {}Hz",
                separator.name(),
                stem,
                buffer.frames(),
                buffer.sample_rate,
                audio.frames(),
                audio.sample_rate
            )));
        }
    }

    Ok(separation)
}

/// What a separation says about the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VocalProfile {
    pub has_vocals: bool,
    pub is_vocals_only: bool,
    pub vocal_level: f32,
    pub accompaniment_level: f32,
}

/// Classify a separation by the mean absolute level of its stems
pub fn analyze_vocals(separation: &Separation) -> VocalProfile {
    let vocal_level = mean_abs(&separation.vocals.samples);
    let accompaniment_level = mean_abs(&separation.accompaniment.samples);

    let has_vocals = vocal_level > VOCAL_PRESENCE_LEVEL;
    let is_vocals_only = has_vocals && accompaniment_level < ACCOMPANIMENT_RATIO * vocal_level;

    info!(
        "Vocal analysis: vocals={:.4}, accompaniment={:.4}, has_vocals={}, vocals_only={}",
        vocal_level, accompaniment_level, has_vocals, is_vocals_only
    );

    VocalProfile {
        has_vocals,
        is_vocals_only,
        vocal_level,
        accompaniment_level,
    }
}

fn mean_abs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}
