//! Splitting long recordings into bounded parts
//!
//! Each window of at most `max_duration_seconds` is cut at the silence that
//! sits closest to the window's end. Windows without usable silence are cut
//! hard at the limit. An optional secondary stream (the unseparated mix) is
//! cut at the same time positions, rescaled to its own sample rate.

use super::processor::write_wav;
use super::silence::{detect_silence, ms_to_frames, SilenceConfig};
use super::AudioBuffer;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration for splitting
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Upper bound on part length in seconds; 0 disables splitting
    pub max_duration_seconds: u32,
    pub silence: SilenceConfig,
    /// Produce parts even when the input fits in one (format normalization)
    pub force_export: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_duration_seconds: 300,
            silence: SilenceConfig::default(),
            force_export: false,
        }
    }
}

impl SplitConfig {
    pub fn new(max_duration_seconds: u32) -> Self {
        Self {
            max_duration_seconds,
            ..Default::default()
        }
    }

    pub fn with_silence(mut self, silence: SilenceConfig) -> Self {
        self.silence = silence;
        self
    }

    pub fn with_force_export(mut self, force_export: bool) -> Self {
        self.force_export = force_export;
        self
    }
}

/// A contiguous piece of a split stream
#[derive(Debug, Clone)]
pub struct AudioPart {
    /// File stem used on export
    pub name: String,
    pub audio: AudioBuffer,
    /// First frame (inclusive) in the source stream
    pub start_frame: usize,
    /// Last frame (exclusive) in the source stream
    pub end_frame: usize,
    /// Part index (0-based)
    pub index: usize,
}

impl AudioPart {
    pub fn start_ms(&self) -> i64 {
        frames_to_ms(self.start_frame, self.audio.sample_rate)
    }

    pub fn end_ms(&self) -> i64 {
        frames_to_ms(self.end_frame, self.audio.sample_rate)
    }
}

/// Result of splitting a primary stream and its optional companion
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub primary: Vec<AudioPart>,
    /// Empty when no secondary stream was given or nothing was exported
    pub secondary: Vec<AudioPart>,
    /// False when the input was handed back whole and needs no export
    pub exported: bool,
}

impl SplitOutput {
    pub fn part_count(&self) -> usize {
        self.primary.len()
    }
}

/// Split `primary` into parts of at most `max_duration_seconds`
///
/// `secondary` is cut at the same time boundaries. The last part may be
/// shorter than the limit. Part boundaries always cover the whole primary
/// stream without gaps or overlap.
pub fn split_audio(
    primary: &AudioBuffer,
    primary_name: &str,
    secondary: Option<(&AudioBuffer, &str)>,
    config: &SplitConfig,
) -> SplitOutput {
    let total_frames = primary.frames();
    let rate = primary.sample_rate;
    let max_frames = ms_to_frames(config.max_duration_seconds as u64 * 1000, rate);
    let fits = config.max_duration_seconds == 0 || total_frames <= max_frames;

    if fits && !config.force_export {
        info!(
            "Audio fits in a single part ({:.2}s), no split needed",
            primary.duration_seconds()
        );
        return SplitOutput {
            primary: vec![AudioPart {
                name: primary_name.to_string(),
                audio: primary.clone(),
                start_frame: 0,
                end_frame: total_frames,
                index: 0,
            }],
            secondary: Vec::new(),
            exported: false,
        };
    }

    if fits {
        info!("Re-exporting audio as a single WAV part");
        let bounds = [(0, total_frames)];
        return SplitOutput {
            primary: cut(primary, &bounds, |_| primary_name.to_string()),
            secondary: secondary
                .map(|(audio, name)| {
                    let bounds = rescale_bounds(&bounds, rate, audio);
                    cut(audio, &bounds, |_| format!("{}_original", name))
                })
                .unwrap_or_default(),
            exported: true,
        };
    }

    let bounds = find_boundaries(primary, config.max_duration_seconds, &config.silence);
    info!(
        "Split {:.2}s of audio into {} parts",
        primary.duration_seconds(),
        bounds.len()
    );

    SplitOutput {
        primary: cut(primary, &bounds, |n| format!("{}_part{}", primary_name, n)),
        secondary: secondary
            .map(|(audio, name)| {
                let bounds = rescale_bounds(&bounds, rate, audio);
                cut(audio, &bounds, |n| format!("{}_original_part{}", name, n))
            })
            .unwrap_or_default(),
        exported: true,
    }
}

/// Frame boundaries `[start, end)` of each part
fn find_boundaries(
    audio: &AudioBuffer,
    max_duration_seconds: u32,
    silence: &SilenceConfig,
) -> Vec<(usize, usize)> {
    let total_frames = audio.frames();
    let rate = audio.sample_rate;
    let target_ms = max_duration_seconds as u64 * 1000;
    let max_frames = ms_to_frames(target_ms, rate).max(1);

    let mut bounds = Vec::new();
    let mut start = 0;

    while start < total_frames {
        let end = (start + max_frames).min(total_frames);
        if end - start < max_frames {
            bounds.push((start, end));
            break;
        }

        // A silence at offset 0 would produce an empty part
        let ranges = detect_silence(audio, start, end, silence);
        let cut_at = ranges
            .iter()
            .filter(|range| range.start_ms > 0)
            .min_by_key(|range| target_ms.abs_diff(range.start_ms))
            .map(|range| start + ms_to_frames(range.start_ms, rate))
            .filter(|&frame| frame > start);

        let split = match cut_at {
            Some(frame) => {
                info!(
                    "Part {}: cut at {:.2}s (silence)",
                    bounds.len() + 1,
                    frame as f64 / rate as f64
                );
                frame
            }
            None => {
                info!(
                    "Part {}: no silence found, cut at {:.2}s",
                    bounds.len() + 1,
                    end as f64 / rate as f64
                );
                end
            }
        };

        bounds.push((start, split));
        start = split;
    }

    bounds
}

/// Map boundaries found at `from_rate` onto `audio`'s own frame grid
///
/// The final part always runs to the end of `audio`.
fn rescale_bounds(
    bounds: &[(usize, usize)],
    from_rate: u32,
    audio: &AudioBuffer,
) -> Vec<(usize, usize)> {
    let total = audio.frames();
    let to_rate = audio.sample_rate;
    let map = |frame: usize| -> usize {
        if from_rate == to_rate || from_rate == 0 {
            return frame.min(total);
        }
        let scaled = frame as u128 * to_rate as u128 / from_rate as u128;
        (scaled as usize).min(total)
    };

    let last = bounds.len().saturating_sub(1);
    bounds
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            let end = if i == last { total } else { map(end) };
            (map(start), end)
        })
        .collect()
}

fn cut(
    audio: &AudioBuffer,
    bounds: &[(usize, usize)],
    name_for: impl Fn(usize) -> String,
) -> Vec<AudioPart> {
    bounds
        .iter()
        .enumerate()
        .map(|(index, &(start, end))| AudioPart {
            name: name_for(index + 1),
            audio: audio.slice_frames(start, end),
            start_frame: start,
            end_frame: end,
            index,
        })
        .collect()
}

/// Write each part to `{dir}/{name}.wav`
pub fn export_parts(parts: &[AudioPart], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(parts.len());
    for part in parts {
        let path = dir.join(format!("{}.wav", part.name));
        write_wav(&path, &part.audio)?;
        info!(
            "Exported {:?} ({:.2}s)",
            path,
            part.audio.duration_seconds()
        );
        paths.push(path);
    }
    Ok(paths)
}

fn frames_to_ms(frames: usize, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    (frames as f64 / sample_rate as f64 * 1000.0) as i64
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

    fn assert_covers(parts: &[AudioPart], total: usize) {
        let mut expected_start = 0;
        for part in parts {
            assert_eq!(part.start_frame, expected_start);
            assert_eq!(part.audio.frames(), part.end_frame - part.start_frame);
            expected_start = part.end_frame;
        }
        assert_eq!(expected_start, total);
    }

    #[test]
    fn test_continuous_audio_cut_at_limit() {
        let audio = AudioBuffer::mono(loud(420.0), RATE);
        let output = split_audio(&audio, "song", None, &SplitConfig::new(300));

        assert!(output.exported);
        assert_eq!(output.part_count(), 2);
        assert_eq!(output.primary[0].end_ms(), 300_000);
        assert_eq!(output.primary[1].start_ms(), 300_000);
        assert_eq!(output.primary[1].end_ms(), 420_000);
        assert_eq!(output.primary[0].name, "song_part1");
        assert_eq!(output.primary[1].name, "song_part2");
        assert_covers(&output.primary, audio.frames());
    }

    #[test]
    fn test_cut_at_silence_nearest_limit() {
        let mut samples = loud(3.0);
        samples.extend(quiet(0.5));
        samples.extend(loud(4.5));
        samples.extend(quiet(0.5));
        samples.extend(loud(16.5));
        let audio = AudioBuffer::mono(samples, RATE);

        let output = split_audio(&audio, "voice", None, &SplitConfig::new(10));
        let bounds: Vec<(i64, i64)> = output
            .primary
            .iter()
            .map(|p| (p.start_ms(), p.end_ms()))
            .collect();

        // Latest silent probe in the first window starts at 8.2s. The
        // second window opens inside that pause, so its only silence is at
        // offset 0 and it falls back to a hard cut.
        assert_eq!(bounds, vec![(0, 8200), (8200, 18200), (18200, 25000)]);
        assert_covers(&output.primary, audio.frames());
    }

    #[test]
    fn test_every_part_within_limit() {
        let mut samples = Vec::new();
        for _ in 0..6 {
            samples.extend(loud(2.7));
            samples.extend(quiet(0.4));
        }
        let audio = AudioBuffer::mono(samples, RATE);
        let output = split_audio(&audio, "a", None, &SplitConfig::new(5));

        assert!(output.part_count() > 1);
        for part in &output.primary {
            assert!(part.audio.frames() <= 5 * RATE as usize);
            assert!(!part.audio.is_empty());
        }
        assert_covers(&output.primary, audio.frames());
    }

    #[test]
    fn test_secondary_split_in_lockstep() {
        let primary = AudioBuffer::mono(loud(25.0), RATE);
        let secondary = AudioBuffer::new(vec![0.1; 25 * RATE as usize * 2], 2, RATE);

        let output = split_audio(
            &primary,
            "song_vocals_only",
            Some((&secondary, "song")),
            &SplitConfig::new(10),
        );

        assert_eq!(output.secondary.len(), output.primary.len());
        for (p, s) in output.primary.iter().zip(&output.secondary) {
            assert_eq!((p.start_frame, p.end_frame), (s.start_frame, s.end_frame));
            assert_eq!(s.audio.channels, 2);
        }
        assert_eq!(output.secondary[0].name, "song_original_part1");
        assert_eq!(output.primary[2].name, "song_vocals_only_part3");
    }

    #[test]
    fn test_secondary_at_other_rate_cut_at_same_times() {
        let primary = AudioBuffer::mono(loud(25.0), RATE);
        let secondary = AudioBuffer::mono(vec![0.1; 25 * 16000], 16000);

        let output = split_audio(
            &primary,
            "song_vocals_only",
            Some((&secondary, "song")),
            &SplitConfig::new(10),
        );

        let times = |parts: &[AudioPart]| -> Vec<(i64, i64)> {
            parts.iter().map(|p| (p.start_ms(), p.end_ms())).collect()
        };
        assert_eq!(times(&output.primary), times(&output.secondary));
        assert_eq!(output.secondary[0].end_ms(), 10_000);
        assert_eq!(output.secondary[1].start_frame, 160_000);
        assert_covers(&output.secondary, secondary.frames());
    }

    #[test]
    fn test_forced_export_rescales_secondary() {
        let primary = AudioBuffer::mono(loud(2.0), RATE);
        let secondary = AudioBuffer::mono(vec![0.1; 2 * 44100], 44100);
        let config = SplitConfig::new(10).with_force_export(true);
        let output = split_audio(&primary, "clip", Some((&secondary, "clip")), &config);

        assert_eq!(output.secondary[0].audio, secondary);
        assert_eq!(output.secondary[0].end_ms(), 2000);
    }

    #[test]
    fn test_short_audio_returned_whole() {
        let audio = AudioBuffer::mono(loud(2.0), RATE);
        let output = split_audio(&audio, "clip", Some((&audio, "clip")), &SplitConfig::new(10));

        assert!(!output.exported);
        assert_eq!(output.part_count(), 1);
        assert_eq!(output.primary[0].audio, audio);
        assert!(output.secondary.is_empty());
    }

    #[test]
    fn test_disabled_splitting() {
        let audio = AudioBuffer::mono(loud(30.0), RATE);
        let output = split_audio(&audio, "clip", None, &SplitConfig::new(0));
        assert!(!output.exported);
        assert_eq!(output.part_count(), 1);
    }

    #[test]
    fn test_forced_export_yields_single_named_part() {
        let audio = AudioBuffer::mono(loud(2.0), RATE);
        let config = SplitConfig::new(10).with_force_export(true);
        let output = split_audio(&audio, "clip", Some((&audio, "clip")), &config);

        assert!(output.exported);
        assert_eq!(output.part_count(), 1);
        assert_eq!(output.primary[0].name, "clip");
        assert_eq!(output.secondary[0].name, "clip_original");
    }

    #[test]
    fn test_export_parts_writes_wavs() {
        let dir = tempfile::tempdir().unwrap();
        let audio = AudioBuffer::mono(loud(25.0), RATE);
        let output = split_audio(&audio, "song", None, &SplitConfig::new(10));

        let paths = export_parts(&output.primary, dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("song_part1.wav"));
        assert!(paths.iter().all(|p| p.exists()));
    }
}
