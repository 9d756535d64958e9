pub mod config;
pub mod spectrogram;
pub mod viseme;

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

pub use config::{ExtractionConfig, VowelMultipliers};
pub use spectrogram::{FftSpectrogram, SpectralTransform, Spectrogram};
pub use viseme::{VisemeExtractor, VisemeFrame};

/// Mouth shapes driven by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vowel {
    A,
    I,
    U,
    O,
}

impl Vowel {
    /// Emission order of vowel frames
    pub const ALL: [Vowel; 4] = [Vowel::A, Vowel::I, Vowel::U, Vowel::O];

    /// Morph name in the model rig
    pub fn morph_name(&self) -> &'static str {
        match self {
            Vowel::A => "あ",
            Vowel::I => "い",
            Vowel::U => "う",
            Vowel::O => "お",
        }
    }

    /// Frequency band (Hz) whose energy drives this vowel
    pub fn band(&self) -> (f32, f32) {
        match self {
            Vowel::A => (800.0, 1200.0),
            Vowel::I => (2300.0, 2700.0),
            Vowel::U => (300.0, 700.0),
            Vowel::O => (500.0, 900.0),
        }
    }

    fn slot(self) -> usize {
        match self {
            Vowel::A => 0,
            Vowel::I => 1,
            Vowel::U => 2,
            Vowel::O => 3,
        }
    }
}

/// One weight per vowel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VowelWeights([f32; 4]);

impl VowelWeights {
    pub fn new(a: f32, i: f32, u: f32, o: f32) -> Self {
        Self([a, i, u, o])
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Scale so the weights sum to 1; all-zero weights stay zero
    pub fn normalized(self) -> Self {
        let total = self.sum();
        if total > 0.0 {
            self.map(|w| w / total)
        } else {
            self
        }
    }

    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self(self.0.map(f))
    }

    /// Element-wise mean of a non-empty run of weights
    pub fn mean<'a>(items: impl IntoIterator<Item = &'a VowelWeights>) -> Self {
        let mut total = [0.0f32; 4];
        let mut count = 0usize;
        for weights in items {
            for (acc, w) in total.iter_mut().zip(weights.0) {
                *acc += w;
            }
            count += 1;
        }
        if count == 0 {
            return Self::default();
        }
        Self(total.map(|t| t / count as f32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vowel, f32)> + '_ {
        Vowel::ALL.into_iter().map(move |v| (v, self[v]))
    }
}

impl Index<Vowel> for VowelWeights {
    type Output = f32;

    fn index(&self, vowel: Vowel) -> &f32 {
        &self.0[vowel.slot()]
    }
}

impl IndexMut<Vowel> for VowelWeights {
    fn index_mut(&mut self, vowel: Vowel) -> &mut f32 {
        &mut self.0[vowel.slot()]
    }
}
