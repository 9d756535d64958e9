use ndarray::{s, Array2};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Magnitude spectrogram with one column per analysis window
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Center frequency (Hz) of each row
    pub frequencies: Vec<f32>,
    /// Shape (bins, columns)
    pub magnitudes: Array2<f32>,
}

impl Spectrogram {
    pub fn num_columns(&self) -> usize {
        self.magnitudes.ncols()
    }

    /// Row whose frequency is closest to `hz` (first on ties)
    pub fn nearest_bin(&self, hz: f32) -> usize {
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        for (i, &f) in self.frequencies.iter().enumerate() {
            let distance = (f - hz).abs();
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }

    /// Mean magnitude of rows `[low, high)` in one column; 0 for an empty slice
    pub fn band_mean(&self, column: usize, low: usize, high: usize) -> f32 {
        if high <= low {
            return 0.0;
        }
        self.magnitudes
            .slice(s![low..high, column])
            .mean()
            .unwrap_or(0.0)
    }

    /// Total magnitude of one column
    pub fn column_energy(&self, column: usize) -> f32 {
        self.magnitudes.column(column).sum()
    }
}

/// Time-frequency transform used for viseme analysis
pub trait SpectralTransform {
    /// Analyze `signal` in non-overlapping windows of `window` samples
    fn spectrogram(&self, signal: &[f32], sample_rate: u32, window: usize) -> Spectrogram;
}

/// Short-time FFT with a Hann taper and per-window mean removal
#[derive(Debug, Clone, Copy, Default)]
pub struct FftSpectrogram;

impl SpectralTransform for FftSpectrogram {
    fn spectrogram(&self, signal: &[f32], sample_rate: u32, window: usize) -> Spectrogram {
        if window == 0 {
            return Spectrogram {
                frequencies: Vec::new(),
                magnitudes: Array2::zeros((0, 0)),
            };
        }

        let n_bins = window / 2 + 1;
        let num_columns = signal.len() / window;

        let frequencies: Vec<f32> = (0..n_bins)
            .map(|k| k as f32 * sample_rate as f32 / window as f32)
            .collect();

        let taper: Vec<f32> = (0..window)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / window as f32).cos()))
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window);

        let mut magnitudes = Array2::<f32>::zeros((n_bins, num_columns));

        for (column, segment) in signal.chunks_exact(window).enumerate() {
            let mean = segment.iter().sum::<f32>() / window as f32;

            let mut buffer: Vec<Complex<f32>> = segment
                .iter()
                .zip(taper.iter())
                .map(|(&s, &w)| Complex::new((s - mean) * w, 0.0))
                .collect();

            fft.process(&mut buffer);

            for (bin, c) in buffer.iter().take(n_bins).enumerate() {
                magnitudes[[bin, column]] = c.norm();
            }
        }

        Spectrogram {
            frequencies,
            magnitudes,
        }
    }
}
