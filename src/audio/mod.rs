pub mod processor;
pub mod segmenter;
pub mod separation;
pub mod silence;

pub use processor::{
    format_duration, format_elapsed, load_audio_file, normalize_peak, write_wav,
};
pub use segmenter::{export_parts, split_audio, AudioPart, SplitConfig, SplitOutput};
pub use separation::{
    analyze_vocals, run_separation, PassthroughSeparator, Separation, VocalProfile, VocalSeparator,
};
pub use silence::{detect_silence, SilenceConfig, SilenceRange};

/// Interleaved PCM audio with its format
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, 1, sample_rate)
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> i64 {
        (self.duration_seconds() * 1000.0) as i64
    }

    /// Copy the frames in `[start, end)`, clamped to the buffer
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioBuffer {
        let channels = self.channels as usize;
        let end = end.min(self.frames());
        let start = start.min(end);
        AudioBuffer {
            samples: self.samples[start * channels..end * channels].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Samples of the frames in `[start, end)` across all channels
    pub fn frame_samples(&self, start: usize, end: usize) -> &[f32] {
        let channels = self.channels as usize;
        let end = end.min(self.frames());
        let start = start.min(end);
        &self.samples[start * channels..end * channels]
    }

    /// Downmix to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}
