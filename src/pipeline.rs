//! End-to-end conversion of audio files into lip-sync motion files

use crate::audio::{
    analyze_vocals, export_parts, format_duration, format_elapsed, load_audio_file,
    run_separation, split_audio, write_wav, AudioBuffer, VocalSeparator,
};
use crate::config::LipSyncConfig;
use crate::engine::viseme::extract_viseme;
use crate::error::{AppError, Result};
use crate::motion::text::encode_name;
use crate::motion::MODEL_NAME_LEN;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

/// Extensions picked up when a directory is given as input
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "flac", "ogg", "m4a", "aac", "aif", "aiff", "opus",
];

static RE_SAFE_PATH_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-_.() A-Za-z0-9/\\:]*").unwrap());

/// Keep the leading run of characters that are safe in a path argument
pub fn sanitize_path(input: &str) -> String {
    RE_SAFE_PATH_PREFIX
        .find(input.trim())
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand command-line inputs into a list of audio files
///
/// Directories contribute their audio files (sorted), `.txt` files are read
/// as one path per line, anything else is taken as given.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_audio_file(path))
                .collect();
            found.sort();
            info!("Found {} audio files in {:?}", found.len(), input);
            files.extend(found);
        } else if input
            .extension()
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false)
        {
            let listing = std::fs::read_to_string(input)?;
            files.extend(
                listing
                    .lines()
                    .map(|line| line.trim().trim_matches('"'))
                    .filter(|line| !line.is_empty())
                    .map(PathBuf::from),
            );
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// What one conversion produced
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub motion_files: Vec<PathBuf>,
    /// WAV files written along the way (vocal stem, split parts)
    pub audio_files: Vec<PathBuf>,
    pub duration_seconds: f64,
    pub vocals_isolated: bool,
    pub elapsed_seconds: f64,
}

/// Convert one audio file into `{base}.vmd` or `{base}_part{n}.vmd`
pub fn convert_file(
    input: &Path,
    output_dir: &Path,
    model_name: &str,
    config: &LipSyncConfig,
    separator: &dyn VocalSeparator,
) -> Result<ConversionReport> {
    let started = Instant::now();

    // Fail on an unusable model name before any audio work
    encode_name::<MODEL_NAME_LEN>(model_name)?;

    let base = input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Audio(format!("Invalid input file name {:?}", input)))?;
    let is_wav = input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    std::fs::create_dir_all(output_dir)?;

    let audio = load_audio_file(input)?;
    info!(
        "Processing {:?} ({})",
        input,
        format_duration(audio.duration_seconds())
    );

    let separation = run_separation(separator, &audio)?;
    let profile = analyze_vocals(&separation);
    if !profile.has_vocals {
        warn!(
            "No vocals detected in {:?}, the mouth will stay mostly closed",
            input
        );
    }

    // A mix is analyzed on its vocal stem while the original is split alongside
    let mixed = profile.has_vocals && !profile.is_vocals_only;
    let (analysis, analysis_name, secondary): (&AudioBuffer, String, Option<(&AudioBuffer, &str)>) =
        if mixed {
            info!("Using isolated vocals for analysis");
            (
                &separation.vocals,
                format!("{}_vocals_only", base),
                Some((&audio, base.as_str())),
            )
        } else {
            (&audio, base.clone(), None)
        };

    let output = split_audio(
        analysis,
        &analysis_name,
        secondary,
        &config.split_config(!is_wav),
    );

    let mut audio_files = Vec::new();
    if output.exported {
        audio_files.extend(export_parts(&output.primary, output_dir)?);
        audio_files.extend(export_parts(&output.secondary, output_dir)?);
    } else if mixed {
        let path = output_dir.join(format!("{}.wav", analysis_name));
        write_wav(&path, analysis)?;
        audio_files.push(path);
    }

    let multipart = output.part_count() > 1;
    let mut motion_files = Vec::with_capacity(output.part_count());
    for part in &output.primary {
        let name = if multipart {
            format!("{}_part{}", base, part.index + 1)
        } else {
            base.clone()
        };
        let motion = extract_viseme(&part.audio, model_name, config);
        let path = output_dir.join(format!("{}.vmd", name));
        motion.save(&path)?;
        motion_files.push(path);
    }

    let elapsed = started.elapsed().as_secs_f64();
    info!(
        "Converted {:?} into {} motion file(s) in {}",
        input,
        motion_files.len(),
        format_elapsed(elapsed)
    );

    Ok(ConversionReport {
        input: input.to_path_buf(),
        motion_files,
        audio_files,
        duration_seconds: audio.duration_seconds(),
        vocals_isolated: mixed,
        elapsed_seconds: elapsed,
    })
}

/// Checkpoint for resuming an interrupted batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub started_at_unix: u64,
    pub source_count: usize,
    pub remaining: Vec<PathBuf>,
}

impl BatchProgress {
    pub const FILE_NAME: &'static str = "batch_progress.json";

    pub fn new(inputs: Vec<PathBuf>) -> Self {
        let started_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            started_at_unix,
            source_count: inputs.len(),
            remaining: inputs,
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(Self::FILE_NAME)
    }

    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(Self::path(dir), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn clear(dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn completed(&self) -> usize {
        self.source_count.saturating_sub(self.remaining.len())
    }
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub converted: Vec<ConversionReport>,
    pub failed: Vec<(PathBuf, String)>,
    pub elapsed_seconds: f64,
}

/// Convert every input, checkpointing after each file
///
/// A leftover checkpoint in `output_dir` takes precedence over `inputs`.
/// Failures are logged and the batch moves on.
pub fn run_batch(
    inputs: Vec<PathBuf>,
    output_dir: &Path,
    model_name: &str,
    config: &LipSyncConfig,
    separator: &dyn VocalSeparator,
) -> Result<BatchSummary> {
    let started = Instant::now();

    let mut progress = match BatchProgress::load(output_dir)? {
        Some(progress) if !progress.remaining.is_empty() => {
            info!(
                "Resuming batch: {} of {} files left",
                progress.remaining.len(),
                progress.source_count
            );
            progress
        }
        _ => BatchProgress::new(inputs),
    };
    progress.save(output_dir)?;

    let mut summary = BatchSummary::default();
    while !progress.remaining.is_empty() {
        let input = progress.remaining.remove(0);
        info!(
            "[{}/{}] {:?}",
            progress.completed(),
            progress.source_count,
            input
        );

        match convert_file(&input, output_dir, model_name, config, separator) {
            Ok(report) => summary.converted.push(report),
            Err(e) => {
                error!("Failed to convert {:?}: {}", input, e);
                summary.failed.push((input, e.to_string()));
            }
        }
        progress.save(output_dir)?;
    }

    BatchProgress::clear(output_dir)?;
    summary.elapsed_seconds = started.elapsed().as_secs_f64();
    info!(
        "Batch finished: {} converted, {} failed in {}",
        summary.converted.len(),
        summary.failed.len(),
        format_elapsed(summary.elapsed_seconds)
    );

    Ok(summary)
}
