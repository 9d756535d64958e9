//! Motion file writer
//!
//! Always emits all five counts, including the optional shadow count.

use super::text::encode_name;
use super::*;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Writer for the binary motion format
pub struct MotionWriter<W: Write> {
    writer: W,
}

impl<W: Write> MotionWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete motion file to the output
    pub fn write_motion(&mut self, motion: &MotionFile) -> Result<(), FormatError> {
        self.writer.write_all(&motion.header)?;
        let model_name: [u8; MODEL_NAME_LEN] = encode_name(&motion.model_name)?;
        self.writer.write_all(&model_name)?;

        self.write_count(motion.bone_frames.len())?;
        for bone in &motion.bone_frames {
            self.write_bone_frame(bone)?;
        }

        self.write_count(motion.morph_frames.len())?;
        for morph in &motion.morph_frames {
            self.write_morph_frame(morph)?;
        }

        self.write_opaque_section(&motion.camera_frames)?;
        self.write_opaque_section(&motion.light_frames)?;
        self.write_opaque_section(&motion.shadow_frames)?;

        self.writer.write_all(&motion.trailing)?;
        Ok(())
    }

    fn write_bone_frame(&mut self, bone: &BoneFrame) -> Result<(), FormatError> {
        let name: [u8; FRAME_NAME_LEN] = encode_name(&bone.name)?;
        self.writer.write_all(&name)?;
        self.writer.write_u32::<LittleEndian>(bone.frame)?;
        for value in bone.position.iter().chain(bone.rotation.iter()) {
            self.writer.write_f32::<LittleEndian>(*value)?;
        }
        self.writer.write_all(&bone.interpolation)?;
        Ok(())
    }

    fn write_morph_frame(&mut self, morph: &MorphFrame) -> Result<(), FormatError> {
        let name: [u8; FRAME_NAME_LEN] = encode_name(&morph.name)?;
        self.writer.write_all(&name)?;
        self.writer.write_u32::<LittleEndian>(morph.frame)?;
        self.writer.write_f32::<LittleEndian>(morph.weight)?;
        Ok(())
    }

    fn write_opaque_section<const N: usize>(
        &mut self,
        frames: &[OpaqueFrame<N>],
    ) -> Result<(), FormatError> {
        self.write_count(frames.len())?;
        for frame in frames {
            self.writer.write_all(&frame.0)?;
        }
        Ok(())
    }

    fn write_count(&mut self, count: usize) -> Result<(), FormatError> {
        self.writer.write_u32::<LittleEndian>(count as u32)?;
        Ok(())
    }
}
