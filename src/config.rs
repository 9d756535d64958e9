//! User configuration
//!
//! Stored as a commented TOML file. Missing keys fall back to their
//! defaults so older config files keep working.

use crate::audio::{SilenceConfig, SplitConfig};
use crate::engine::{ExtractionConfig, VowelMultipliers};
use crate::error::{AppError, Result};
use crate::motion::OptimizeOptions;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

/// One documented configuration key
#[derive(Debug, Clone, Copy)]
pub struct ConfigField {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Every key the config file understands, in file order
pub const CONFIG_SCHEMA: &[ConfigField] = &[
    ConfigField {
        key: "a_weight_multiplier",
        default: "1.2",
        description: "Intensity of the 'あ' (A) sound. Increase to open the mouth wider overall.",
    },
    ConfigField {
        key: "i_weight_multiplier",
        default: "0.8",
        description: "Intensity of the 'い' (I) sound. Increase for a wider mouth while talking.",
    },
    ConfigField {
        key: "o_weight_multiplier",
        default: "1.1",
        description: "Intensity of the 'お' (O) sound. Increase for a medium round mouth shape.",
    },
    ConfigField {
        key: "u_weight_multiplier",
        default: "0.9",
        description: "Intensity of the 'う' (U) sound. Increase for a small round mouth shape.",
    },
    ConfigField {
        key: "max_duration",
        default: "300",
        description: "Maximum length of one audio part in seconds. 0 disables splitting.",
    },
    ConfigField {
        key: "optimize_vmd",
        default: "true",
        description: "Drop redundant keyframes from generated motion files.",
    },
    ConfigField {
        key: "silence_threshold_db",
        default: "-60.0",
        description: "RMS level in dBFS at or below which audio counts as silence when splitting.",
    },
    ConfigField {
        key: "min_silence_len_ms",
        default: "300",
        description: "Shortest pause in milliseconds that can serve as a split point.",
    },
    ConfigField {
        key: "position_tolerance",
        default: "0.005",
        description: "Bone position drift allowed when optimizing motion files.",
    },
    ConfigField {
        key: "rotation_tolerance",
        default: "0.005",
        description: "Bone rotation drift allowed when optimizing motion files.",
    },
];

/// Tunable settings for conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    pub a_weight_multiplier: f64,
    pub i_weight_multiplier: f64,
    pub o_weight_multiplier: f64,
    pub u_weight_multiplier: f64,
    pub max_duration: u32,
    pub optimize_vmd: bool,
    pub silence_threshold_db: f64,
    pub min_silence_len_ms: u32,
    pub position_tolerance: f64,
    pub rotation_tolerance: f64,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            a_weight_multiplier: 1.2,
            i_weight_multiplier: 0.8,
            o_weight_multiplier: 1.1,
            u_weight_multiplier: 0.9,
            max_duration: 300,
            optimize_vmd: true,
            silence_threshold_db: -60.0,
            min_silence_len_ms: 300,
            position_tolerance: 0.005,
            rotation_tolerance: 0.005,
        }
    }
}

impl LipSyncConfig {
    /// Parse TOML text; an empty document yields the defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            warn!("Configuration is empty, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load `path`, or write the commented template there and use defaults
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        info!("Configuration not found, creating {:?}", path);
        write_template(path)?;
        Ok(Self::default())
    }

    /// Save the current values with schema comments
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_commented_toml()?)?;
        Ok(())
    }

    pub fn to_commented_toml(&self) -> Result<String> {
        let table = toml::Value::try_from(self).map_err(|e| AppError::Config(e.to_string()))?;
        let mut out = template_preamble();
        for field in CONFIG_SCHEMA {
            let value = table
                .get(field.key)
                .ok_or_else(|| AppError::Config(format!("missing key {}", field.key)))?;
            let _ = writeln!(out, "{} = {}  # {}", field.key, value, field.description);
        }
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        let multipliers = [
            ("a_weight_multiplier", self.a_weight_multiplier),
            ("i_weight_multiplier", self.i_weight_multiplier),
            ("o_weight_multiplier", self.o_weight_multiplier),
            ("u_weight_multiplier", self.u_weight_multiplier),
            ("position_tolerance", self.position_tolerance),
            ("rotation_tolerance", self.rotation_tolerance),
        ];
        for (key, value) in multipliers {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    key, value
                )));
            }
        }
        if self.min_silence_len_ms == 0 {
            return Err(AppError::Config(
                "min_silence_len_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_duration(mut self, seconds: u32) -> Self {
        self.max_duration = seconds;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize_vmd = optimize;
        self
    }

    pub fn with_multipliers(mut self, multipliers: VowelMultipliers) -> Self {
        self.a_weight_multiplier = multipliers.a as f64;
        self.i_weight_multiplier = multipliers.i as f64;
        self.u_weight_multiplier = multipliers.u as f64;
        self.o_weight_multiplier = multipliers.o as f64;
        self
    }

    pub fn multipliers(&self) -> VowelMultipliers {
        VowelMultipliers {
            a: self.a_weight_multiplier as f32,
            i: self.i_weight_multiplier as f32,
            u: self.u_weight_multiplier as f32,
            o: self.o_weight_multiplier as f32,
        }
    }

    pub fn extraction(&self) -> ExtractionConfig {
        ExtractionConfig::default().with_multipliers(self.multipliers())
    }

    pub fn optimize_options(&self) -> OptimizeOptions {
        OptimizeOptions::new(self.position_tolerance as f32, self.rotation_tolerance as f32)
    }

    pub fn split_config(&self, force_export: bool) -> SplitConfig {
        SplitConfig::new(self.max_duration)
            .with_silence(SilenceConfig::new(
                self.silence_threshold_db as f32,
                self.min_silence_len_ms,
            ))
            .with_force_export(force_export)
    }
}

fn template_preamble() -> String {
    "# Configuration file for vmd-lipsync\n# Adjust these values to fine-tune the lip sync:\n\n"
        .to_string()
}

/// Commented default configuration
pub fn render_template() -> String {
    let mut out = template_preamble();
    for field in CONFIG_SCHEMA {
        let _ = writeln!(out, "{} = {}  # {}", field.key, field.default, field.description);
    }
    out
}

pub fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_template())?;
    Ok(())
}
