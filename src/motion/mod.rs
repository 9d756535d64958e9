//! VMD motion file model and codec
//!
//! Only the fields the format defines are decoded. Camera, light and
//! self-shadow records are carried as fixed-size opaque blocks, and any
//! bytes after the shadow section are kept verbatim.

pub mod merger;
pub mod optimizer;
pub mod reader;
pub mod text;
pub mod writer;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub use merger::{merge_tracks, replace_tracks, MergeMode, MOUTH_MORPHS};
pub use optimizer::{optimize_motion, OptimizeOptions};
pub use reader::MotionReader;
pub use writer::MotionWriter;

/// Length of the header / version tag
pub const HEADER_LEN: usize = 30;
/// Byte budget of the model name field
pub const MODEL_NAME_LEN: usize = 20;
/// Byte budget of bone and morph names
pub const FRAME_NAME_LEN: usize = 15;
/// Length of the opaque bone interpolation curve block
pub const INTERPOLATION_LEN: usize = 64;

pub const BONE_FRAME_LEN: usize = FRAME_NAME_LEN + 4 + 12 + 16 + INTERPOLATION_LEN;
pub const MORPH_FRAME_LEN: usize = FRAME_NAME_LEN + 4 + 4;
pub const CAMERA_FRAME_LEN: usize = 61;
pub const LIGHT_FRAME_LEN: usize = 28;
pub const SHADOW_FRAME_LEN: usize = 9;

/// Header written for every file this crate creates
pub const CURRENT_HEADER: &[u8; HEADER_LEN] = b"Vocaloid Motion Data 0002\0\0\0\0\0";

/// Header prefixes accepted on read (current and legacy variants)
pub const RECOGNIZED_HEADERS: [&[u8]; 2] =
    [b"Vocaloid Motion Data 0002", b"Vocaloid Motion Data file"];

/// Codec failures
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Unrecognized motion file header")]
    InvalidHeader,

    #[error("Truncated motion file: {section} needs {needed} bytes but only {remaining} remain")]
    TruncatedFile {
        section: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Name '{name}' encodes to {len} bytes, field holds {budget}")]
    NameTooLong {
        name: String,
        len: usize,
        budget: usize,
    },

    #[error("Name '{0}' cannot be encoded as Shift_JIS")]
    UnencodableName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A record the codec never interprets, only counts and copies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueFrame<const N: usize>(pub [u8; N]);

pub type CameraFrame = OpaqueFrame<CAMERA_FRAME_LEN>;
pub type LightFrame = OpaqueFrame<LIGHT_FRAME_LEN>;
pub type ShadowFrame = OpaqueFrame<SHADOW_FRAME_LEN>;

/// Timed weight for one facial morph channel
#[derive(Debug, Clone, PartialEq)]
pub struct MorphFrame {
    pub name: String,
    pub frame: u32,
    pub weight: f32,
}

impl MorphFrame {
    pub fn new(name: impl Into<String>, frame: u32, weight: f32) -> Self {
        Self {
            name: name.into(),
            frame,
            weight,
        }
    }
}

/// Timed position + rotation keyframe for one bone
#[derive(Debug, Clone, PartialEq)]
pub struct BoneFrame {
    pub name: String,
    pub frame: u32,
    pub position: [f32; 3],
    /// Quaternion components in stored order
    pub rotation: [f32; 4],
    pub interpolation: [u8; INTERPOLATION_LEN],
}

impl BoneFrame {
    pub fn new(
        name: impl Into<String>,
        frame: u32,
        position: [f32; 3],
        rotation: [f32; 4],
    ) -> Self {
        Self {
            name: name.into(),
            frame,
            position,
            rotation,
            interpolation: [0u8; INTERPOLATION_LEN],
        }
    }
}

/// A decoded motion file
#[derive(Debug, Clone, PartialEq)]
pub struct MotionFile {
    pub header: [u8; HEADER_LEN],
    pub model_name: String,
    pub bone_frames: Vec<BoneFrame>,
    pub morph_frames: Vec<MorphFrame>,
    pub camera_frames: Vec<CameraFrame>,
    pub light_frames: Vec<LightFrame>,
    pub shadow_frames: Vec<ShadowFrame>,
    /// Vendor sections after the shadow frames, preserved verbatim
    pub trailing: Vec<u8>,
}

impl MotionFile {
    /// Create an empty motion file for the given model
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            header: *CURRENT_HEADER,
            model_name: model_name.into(),
            bone_frames: Vec::new(),
            morph_frames: Vec::new(),
            camera_frames: Vec::new(),
            light_frames: Vec::new(),
            shadow_frames: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Decode a motion file from bytes
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        MotionReader::new(bytes).read_motion()
    }

    /// Encode the motion file to bytes
    pub fn write(&self) -> Result<Vec<u8>, FormatError> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        MotionWriter::new(&mut buffer).write_motion(self)?;
        Ok(buffer)
    }

    /// Read and decode a motion file from disk
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let bytes = std::fs::read(path)?;
        let motion = Self::read(&bytes)?;
        info!(
            "Loaded {:?}: {} bone frames, {} morph frames",
            path,
            motion.bone_frames.len(),
            motion.morph_frames.len()
        );
        Ok(motion)
    }

    /// Encode and write the motion file to disk
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        // Encode before touching the file
        let bytes = self.write()?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        info!("Motion file saved at: {:?}", path);
        Ok(())
    }

    pub fn add_morph_frame(&mut self, name: impl Into<String>, frame: u32, weight: f32) {
        self.morph_frames.push(MorphFrame::new(name, frame, weight));
    }

    /// Distinct morph channel names in order of first appearance
    pub fn morph_channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for frame in &self.morph_frames {
            if !names.contains(&frame.name.as_str()) {
                names.push(&frame.name);
            }
        }
        names
    }

    /// Size of the encoded file in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + MODEL_NAME_LEN
            + 4
            + self.bone_frames.len() * BONE_FRAME_LEN
            + 4
            + self.morph_frames.len() * MORPH_FRAME_LEN
            + 4
            + self.camera_frames.len() * CAMERA_FRAME_LEN
            + 4
            + self.light_frames.len() * LIGHT_FRAME_LEN
            + 4
            + self.shadow_frames.len() * SHADOW_FRAME_LEN
            + self.trailing.len()
    }
}
