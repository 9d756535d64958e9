//! Command-line front end
//!
//! Run with: cargo run -- convert song.mp3 -o out

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use vmd_lipsync::audio::{export_parts, load_audio_file, split_audio, PassthroughSeparator};
use vmd_lipsync::config::{write_template, LipSyncConfig};
use vmd_lipsync::motion::{merge_tracks, optimize_motion, replace_tracks, MergeMode, MotionFile};
use vmd_lipsync::pipeline::{collect_inputs, run_batch, sanitize_path};
use vmd_lipsync::{init_logging, Result};

/// Generate VMD lip-sync motion from speech audio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert audio files into lip-sync motion files
    Convert {
        /// Audio files, directories of audio files, or .txt lists of paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Model name written into the motion files
        #[arg(short, long, default_value = "Model")]
        model: String,

        /// Configuration file (created with defaults if missing)
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },

    /// Drop redundant keyframes from a motion file
    Optimize {
        input: PathBuf,

        /// Output file (defaults to <input>_optimized.vmd)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        position_tolerance: Option<f32>,

        #[arg(long)]
        rotation_tolerance: Option<f32>,
    },

    /// Splice the facial track of one motion file into another
    Merge {
        /// Motion file providing the facial frames
        source: PathBuf,

        /// Motion file receiving them
        target: PathBuf,

        /// Which morphs to take: all-mouths, aiou or all-face
        #[arg(long, default_value = "aiou")]
        mode: MergeMode,

        /// Remove the target's matching channels before merging
        #[arg(long)]
        replace: bool,

        /// Output file (defaults to <target>_merged.vmd)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split long audio into WAV parts at pauses
    Split {
        audio: PathBuf,

        /// Companion audio cut at the same positions
        #[arg(long)]
        secondary: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Maximum part length in seconds (overrides the config file)
        #[arg(long)]
        max_duration: Option<u32>,

        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },

    /// Write a commented default configuration file
    InitConfig {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Convert {
            inputs,
            output_dir,
            model,
            config,
        } => {
            let config = LipSyncConfig::load_or_create(&clean(&config))?;
            let files = collect_inputs(&inputs)?;
            if files.is_empty() {
                warn!("No audio files to convert");
                return Ok(());
            }

            let summary = run_batch(
                files,
                &clean(&output_dir),
                &model,
                &config,
                &PassthroughSeparator,
            )?;
            for (input, reason) in &summary.failed {
                warn!("Skipped {:?}: {}", input, reason);
            }
            Ok(())
        }

        Commands::Optimize {
            input,
            output,
            position_tolerance,
            rotation_tolerance,
        } => {
            let motion = MotionFile::load(&input)?;
            let mut options = vmd_lipsync::motion::OptimizeOptions::default();
            if let Some(tolerance) = position_tolerance {
                options.position_tolerance = tolerance;
            }
            if let Some(tolerance) = rotation_tolerance {
                options.rotation_tolerance = tolerance;
            }

            let optimized = optimize_motion(motion, &options);
            let output = output.unwrap_or_else(|| sibling(&input, "optimized"));
            optimized.save(&output)?;
            info!("Wrote {:?}", output);
            Ok(())
        }

        Commands::Merge {
            source,
            target,
            mode,
            replace,
            output,
        } => {
            let source_motion = MotionFile::load(&source)?;
            let target_motion = MotionFile::load(&target)?;

            let merged = if replace {
                replace_tracks(&source_motion, target_motion, mode)
            } else {
                merge_tracks(&source_motion, target_motion, mode)
            };

            let output = output.unwrap_or_else(|| sibling(&target, "merged"));
            merged.save(&output)?;
            info!("Wrote {:?}", output);
            Ok(())
        }

        Commands::Split {
            audio,
            secondary,
            output_dir,
            max_duration,
            config,
        } => {
            let mut config = LipSyncConfig::load_or_create(&clean(&config))?;
            if let Some(seconds) = max_duration {
                config = config.with_max_duration(seconds);
            }

            let primary = load_audio_file(&audio)?;
            let companion = match &secondary {
                Some(path) => Some(load_audio_file(path)?),
                None => None,
            };

            let primary_name = stem(&audio);
            let secondary_name = secondary.as_deref().map(stem).unwrap_or_default();
            let output = split_audio(
                &primary,
                &primary_name,
                companion.as_ref().map(|a| (a, secondary_name.as_str())),
                &config.split_config(false),
            );

            if !output.exported {
                info!("{:?} is within the limit, nothing to split", audio);
                return Ok(());
            }
            let output_dir = clean(&output_dir);
            export_parts(&output.primary, &output_dir)?;
            export_parts(&output.secondary, &output_dir)?;
            Ok(())
        }

        Commands::InitConfig { config, force } => {
            let path = clean(&config);
            if path.exists() && !force {
                warn!("{:?} already exists, use --force to overwrite", path);
                return Ok(());
            }
            write_template(&path)?;
            info!("Wrote default configuration to {:?}", path);
            Ok(())
        }
    }
}

fn clean(path: &Path) -> PathBuf {
    PathBuf::from(sanitize_path(&path.to_string_lossy()))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `dir/name.vmd` -> `dir/name_{suffix}.vmd`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    path.with_file_name(format!("{}_{}.vmd", stem(path), suffix))
}
