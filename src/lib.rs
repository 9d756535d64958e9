pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod motion;
pub mod pipeline;

use std::fs::File;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use audio::{split_audio, AudioBuffer, SplitConfig, SplitOutput};
pub use config::LipSyncConfig;
pub use engine::viseme::extract_viseme;
pub use engine::{VisemeExtractor, Vowel};
pub use error::{AppError, Result};
pub use motion::{merge_tracks, optimize_motion, replace_tracks, MergeMode, MotionFile};
pub use pipeline::{convert_file, run_batch, ConversionReport};

/// Install the global tracing subscriber
///
/// Console output always, plus a plain-text copy in `log_file` when given.
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_directive = if verbose {
        "vmd_lipsync=debug"
    } else {
        "vmd_lipsync=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Config(format!("Logging already initialized: {}", e)))?;

    Ok(())
}
