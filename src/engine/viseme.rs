//! Vowel mouth-shape extraction
//!
//! The clip is cut into one window per output frame. Each window's energy
//! in four formant bands gives a vowel mix, which is smoothed over the last
//! few frames, reshaped by per-vowel gains and scaled by loudness. Windows
//! below the speech gate close the mouth.

use super::config::ExtractionConfig;
use super::spectrogram::{FftSpectrogram, SpectralTransform};
use super::{Vowel, VowelWeights};
use crate::audio::{normalize_peak, AudioBuffer};
use crate::config::LipSyncConfig;
use crate::motion::optimizer::optimize_motion;
use crate::motion::MotionFile;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// One vowel weight at one output frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisemeFrame {
    pub vowel: Vowel,
    pub frame: u32,
    pub weight: f32,
}

/// Extracts vowel weights from audio
pub struct VisemeExtractor<T: SpectralTransform = FftSpectrogram> {
    transform: T,
    config: ExtractionConfig,
}

impl VisemeExtractor<FftSpectrogram> {
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_transform(FftSpectrogram, config)
    }
}

impl Default for VisemeExtractor<FftSpectrogram> {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl<T: SpectralTransform> VisemeExtractor<T> {
    pub fn with_transform(transform: T, config: ExtractionConfig) -> Self {
        Self { transform, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Final weights for each output frame
    pub fn extract_weights(&self, audio: &AudioBuffer) -> Vec<VowelWeights> {
        let mut signal = audio.to_mono();
        match normalize_peak(&mut signal) {
            Ok(peak) => debug!("Normalized audio (peak {:.4})", peak),
            Err(e) => warn!("{}, emitting closed mouth for the whole clip", e),
        }

        let window = self.config.window_samples(audio.sample_rate);
        if window == 0 {
            return Vec::new();
        }

        let spectrogram = self
            .transform
            .spectrogram(&signal, audio.sample_rate, window);
        let num_columns = spectrogram.num_columns();

        let bands: Vec<(Vowel, usize, usize)> = Vowel::ALL
            .iter()
            .map(|&vowel| {
                let (low, high) = vowel.band();
                (
                    vowel,
                    spectrogram.nearest_bin(low),
                    spectrogram.nearest_bin(high),
                )
            })
            .collect();

        let energies: Vec<f32> = (0..num_columns)
            .map(|column| spectrogram.column_energy(column))
            .collect();
        let max_energy = energies.iter().cloned().fold(0.0f32, f32::max);
        let gate = self.config.speech_threshold * max_energy;

        let smoothing = self.config.smoothing_window.max(1);
        let mut history: VecDeque<VowelWeights> = VecDeque::with_capacity(smoothing);
        let mut weights = Vec::with_capacity(num_columns);
        let mut speech_columns = 0usize;

        for (column, &energy) in energies.iter().enumerate() {
            let mut raw = VowelWeights::default();
            for &(vowel, low, high) in &bands {
                raw[vowel] = spectrogram.band_mean(column, low, high);
            }

            if history.len() == smoothing {
                history.pop_front();
            }
            history.push_back(raw.normalized());
            let smoothed = VowelWeights::mean(&history);

            if energy > gate {
                speech_columns += 1;
                let scale = (energy / max_energy).clamp(0.0, 1.0).sqrt();
                let adjusted = self
                    .config
                    .multipliers
                    .adjust(smoothed, self.config.open_threshold);
                weights.push(adjusted.map(|w| (w * scale).min(1.0)));
            } else {
                weights.push(VowelWeights::default());
            }
        }

        info!(
            "Extracted {} frames ({} with speech) using {}-sample windows",
            num_columns, speech_columns, window
        );

        weights
    }

    /// Vowel frames in frame order, four per frame (あ, い, う, お)
    pub fn extract(&self, audio: &AudioBuffer) -> Vec<VisemeFrame> {
        self.extract_weights(audio)
            .iter()
            .enumerate()
            .flat_map(|(frame, weights)| {
                weights.iter().map(move |(vowel, weight)| VisemeFrame {
                    vowel,
                    frame: frame as u32,
                    weight,
                })
            })
            .collect()
    }

    /// Build a motion file holding only the vowel morph track
    pub fn to_motion(&self, audio: &AudioBuffer, model_name: &str) -> MotionFile {
        let mut motion = MotionFile::new(model_name);
        for viseme in self.extract(audio) {
            motion.add_morph_frame(viseme.vowel.morph_name(), viseme.frame, viseme.weight);
        }
        motion
    }
}

/// Turn audio into a lip-sync motion file using the user configuration
pub fn extract_viseme(audio: &AudioBuffer, model_name: &str, config: &LipSyncConfig) -> MotionFile {
    let extractor = VisemeExtractor::new(config.extraction());
    let motion = extractor.to_motion(audio, model_name);

    if config.optimize_vmd {
        optimize_motion(motion, &config.optimize_options())
    } else {
        motion
    }
}
