//! Motion file reader
//!
//! Decodes sections strictly in format order. Every declared count is
//! checked against the bytes that remain before anything is allocated.

use super::text::decode_name;
use super::*;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use tracing::debug;

/// Reader over an in-memory motion file
pub struct MotionReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> MotionReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    /// Read a complete motion file
    pub fn read_motion(&mut self) -> Result<MotionFile, FormatError> {
        let header = self.read_header()?;

        self.require("model name", MODEL_NAME_LEN)?;
        let mut name_field = [0u8; MODEL_NAME_LEN];
        self.cursor.read_exact(&mut name_field)?;
        let model_name = decode_name(&name_field);

        let bone_count = self.read_count("bone frames", BONE_FRAME_LEN)?;
        let mut bone_frames = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            bone_frames.push(self.read_bone_frame()?);
        }

        let morph_count = self.read_count("morph frames", MORPH_FRAME_LEN)?;
        let mut morph_frames = Vec::with_capacity(morph_count);
        for _ in 0..morph_count {
            morph_frames.push(self.read_morph_frame()?);
        }

        let camera_frames = self.read_opaque_section::<CAMERA_FRAME_LEN>("camera frames")?;
        let light_frames = self.read_opaque_section::<LIGHT_FRAME_LEN>("light frames")?;

        // Older files end right after the light section
        let shadow_frames = if self.remaining() > 0 {
            self.read_opaque_section::<SHADOW_FRAME_LEN>("shadow frames")?
        } else {
            Vec::new()
        };

        let mut trailing = Vec::new();
        self.cursor.read_to_end(&mut trailing)?;

        debug!(
            "Decoded motion '{}': {} bones, {} morphs, {} camera, {} light, {} shadow, \
             {} trailing bytes",
            model_name,
            bone_frames.len(),
            morph_frames.len(),
            camera_frames.len(),
            light_frames.len(),
            shadow_frames.len(),
            trailing.len()
        );

        Ok(MotionFile {
            header,
            model_name,
            bone_frames,
            morph_frames,
            camera_frames,
            light_frames,
            shadow_frames,
            trailing,
        })
    }

    fn read_header(&mut self) -> Result<[u8; HEADER_LEN], FormatError> {
        let bytes = *self.cursor.get_ref();
        if !RECOGNIZED_HEADERS
            .iter()
            .any(|prefix| bytes.starts_with(prefix))
        {
            return Err(FormatError::InvalidHeader);
        }

        self.require("header", HEADER_LEN)?;
        let mut header = [0u8; HEADER_LEN];
        self.cursor.read_exact(&mut header)?;
        Ok(header)
    }

    fn read_bone_frame(&mut self) -> Result<BoneFrame, FormatError> {
        let name = self.read_frame_name()?;
        let frame = self.cursor.read_u32::<LittleEndian>()?;

        let mut position = [0f32; 3];
        self.cursor.read_f32_into::<LittleEndian>(&mut position)?;
        let mut rotation = [0f32; 4];
        self.cursor.read_f32_into::<LittleEndian>(&mut rotation)?;

        let mut interpolation = [0u8; INTERPOLATION_LEN];
        self.cursor.read_exact(&mut interpolation)?;

        Ok(BoneFrame {
            name,
            frame,
            position,
            rotation,
            interpolation,
        })
    }

    fn read_morph_frame(&mut self) -> Result<MorphFrame, FormatError> {
        let name = self.read_frame_name()?;
        let frame = self.cursor.read_u32::<LittleEndian>()?;
        let weight = self.cursor.read_f32::<LittleEndian>()?;
        Ok(MorphFrame { name, frame, weight })
    }

    fn read_frame_name(&mut self) -> Result<String, FormatError> {
        let mut field = [0u8; FRAME_NAME_LEN];
        self.cursor.read_exact(&mut field)?;
        Ok(decode_name(&field))
    }

    fn read_opaque_section<const N: usize>(
        &mut self,
        section: &'static str,
    ) -> Result<Vec<OpaqueFrame<N>>, FormatError> {
        let count = self.read_count(section, N)?;
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            let mut block = [0u8; N];
            self.cursor.read_exact(&mut block)?;
            frames.push(OpaqueFrame(block));
        }
        Ok(frames)
    }

    /// Read a u32 count and make sure `count * width` bytes follow it
    fn read_count(&mut self, section: &'static str, width: usize) -> Result<usize, FormatError> {
        self.require(section, 4)?;
        let count = self.cursor.read_u32::<LittleEndian>()? as usize;
        let needed = count.saturating_mul(width);
        self.require(section, needed)?;
        Ok(count)
    }

    fn require(&self, section: &'static str, needed: usize) -> Result<(), FormatError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(FormatError::TruncatedFile {
                section,
                needed,
                remaining,
            });
        }
        Ok(())
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }
}
