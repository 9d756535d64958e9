use super::{Vowel, VowelWeights};
use serde::{Deserialize, Serialize};

/// Per-vowel gain applied after smoothing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VowelMultipliers {
    pub a: f32,
    pub i: f32,
    pub u: f32,
    pub o: f32,
}

impl Default for VowelMultipliers {
    fn default() -> Self {
        Self {
            a: 1.2,
            i: 0.8,
            u: 0.9,
            o: 1.1,
        }
    }
}

impl VowelMultipliers {
    pub fn get(&self, vowel: Vowel) -> f32 {
        match vowel {
            Vowel::A => self.a,
            Vowel::I => self.i,
            Vowel::U => self.u,
            Vowel::O => self.o,
        }
    }

    /// Apply the gains and renormalize
    ///
    /// The A and O gains only kick in above `open_threshold` so quiet
    /// frames do not get an exaggerated open mouth.
    pub fn adjust(&self, weights: VowelWeights, open_threshold: f32) -> VowelWeights {
        let mut adjusted = weights;
        for vowel in Vowel::ALL {
            let gated = matches!(vowel, Vowel::A | Vowel::O);
            if !gated || weights[vowel] > open_threshold {
                adjusted[vowel] *= self.get(vowel);
            }
        }
        adjusted.normalized()
    }
}

/// Configuration for viseme extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub multipliers: VowelMultipliers,
    /// Output frames per second (one analysis window per frame)
    pub frame_rate: u32,
    /// Number of columns in the trailing smoothing mean
    pub smoothing_window: usize,
    /// Fraction of the loudest column's energy that counts as speech
    pub speech_threshold: f32,
    /// Weight above which the A and O gains apply
    pub open_threshold: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            multipliers: VowelMultipliers::default(),
            frame_rate: 30,
            smoothing_window: 5,
            speech_threshold: 0.01,
            open_threshold: 0.3,
        }
    }
}

impl ExtractionConfig {
    pub fn with_multipliers(mut self, multipliers: VowelMultipliers) -> Self {
        self.multipliers = multipliers;
        self
    }

    pub fn with_smoothing_window(mut self, smoothing_window: usize) -> Self {
        self.smoothing_window = smoothing_window.max(1);
        self
    }

    pub fn with_speech_threshold(mut self, speech_threshold: f32) -> Self {
        self.speech_threshold = speech_threshold.clamp(0.0, 1.0);
        self
    }

    /// Analysis window length in samples
    pub fn window_samples(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 / self.frame_rate.max(1) as f64).round() as usize
    }
}
