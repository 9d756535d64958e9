//! Splice a facial track from one motion file into another
//!
//! Bone, camera, light and shadow data of the target are left untouched.
//! Frames that land on the same timestamp are all kept.

use super::{MorphFrame, MotionFile};
use crate::engine::Vowel;
use crate::error::{AppError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Morphs conventionally grouped as "mouth" in model rigs
pub const MOUTH_MORPHS: [&str; 23] = [
    "あ", "い", "う", "え", "お", "あ２", "ん", "▲", "∧", "□", "ワ", "ω",
    "ω□", "にやり", "にやり２", "にっこり", "ぺろっ", "てへぺろ",
    "てへぺろ２", "口角上げ", "口角下げ", "口横広げ", "歯無し上",
];

/// Which part of the source morph track replaces the target's
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Every mouth morph in [`MOUTH_MORPHS`]
    AllMouths,
    /// Only the four vowel channels
    Aiou,
    /// The entire morph track
    AllFace,
}

impl MergeMode {
    fn replaces(&self, name: &str) -> bool {
        match self {
            MergeMode::AllMouths => MOUTH_MORPHS.contains(&name),
            MergeMode::Aiou => Vowel::ALL.iter().any(|v| v.morph_name() == name),
            MergeMode::AllFace => true,
        }
    }
}

impl FromStr for MergeMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "ALL_MOUTHS" => Ok(MergeMode::AllMouths),
            "AIOU" => Ok(MergeMode::Aiou),
            "ALL_FACE" => Ok(MergeMode::AllFace),
            _ => Err(AppError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeMode::AllMouths => "ALL_MOUTHS",
            MergeMode::Aiou => "AIOU",
            MergeMode::AllFace => "ALL_FACE",
        };
        f.write_str(name)
    }
}

/// Splice the source frames selected by `mode` into the target
///
/// `ALL_FACE` discards the target's whole morph track first. For `AIOU` and
/// `ALL_MOUTHS` the target's own frames stay and the source frames are
/// interleaved with them by timestamp.
pub fn merge_tracks(source: &MotionFile, target: MotionFile, mode: MergeMode) -> MotionFile {
    let keep_target = mode != MergeMode::AllFace;
    splice(source, target, mode, |_: &str| keep_target)
}

/// Like [`merge_tracks`], but the target's selected channels are removed
/// before the source frames go in
pub fn replace_tracks(source: &MotionFile, target: MotionFile, mode: MergeMode) -> MotionFile {
    splice(source, target, mode, |name: &str| !mode.replaces(name))
}

fn splice(
    source: &MotionFile,
    mut target: MotionFile,
    mode: MergeMode,
    keep_target: impl Fn(&str) -> bool,
) -> MotionFile {
    let target_before = target.morph_frames.len();

    let mut merged: Vec<MorphFrame> = target
        .morph_frames
        .into_iter()
        .filter(|frame| keep_target(&frame.name))
        .collect();
    let kept_from_target = merged.len();

    merged.extend(
        source
            .morph_frames
            .iter()
            .filter(|frame| mode.replaces(&frame.name))
            .cloned(),
    );

    // Stable: on equal timestamps target frames stay ahead of source frames
    merged.sort_by_key(|frame| frame.frame);

    info!(
        "Merged {} track: kept {} of {} target frames, took {} from source",
        mode,
        kept_from_target,
        target_before,
        merged.len() - kept_from_target
    );

    target.morph_frames = merged;
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::BoneFrame;

    fn frames_named(motion: &MotionFile, name: &str) -> Vec<u32> {
        motion
            .morph_frames
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.frame)
            .collect()
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("AIOU".parse::<MergeMode>().unwrap(), MergeMode::Aiou);
        assert_eq!("all-mouths".parse::<MergeMode>().unwrap(), MergeMode::AllMouths);
        assert_eq!("All_Face".parse::<MergeMode>().unwrap(), MergeMode::AllFace);
        assert!(matches!(
            "EYES".parse::<MergeMode>(),
            Err(AppError::InvalidMode(mode)) if mode == "EYES"
        ));
    }

    #[test]
    fn test_aiou_interleaves_by_frame() {
        let mut target = MotionFile::new("Target");
        target.add_morph_frame("あ", 5, 0.1);
        target.add_morph_frame("あ", 15, 0.2);
        target.add_morph_frame("まばたき", 3, 1.0);

        let mut source = MotionFile::new("Source");
        for frame in [0, 10, 20] {
            source.add_morph_frame("あ", frame, 0.9);
        }
        source.add_morph_frame("まばたき", 8, 0.5);

        let merged = merge_tracks(&source, target.clone(), MergeMode::Aiou);
        assert_eq!(frames_named(&merged, "あ"), vec![0, 5, 10, 15, 20]);
        assert_eq!(frames_named(&merged, "まばたき"), vec![3]);
        let frames: Vec<u32> = merged.morph_frames.iter().map(|f| f.frame).collect();
        assert!(frames.windows(2).all(|w| w[0] <= w[1]));

        // Replacing drops the target's own vowel frames first
        let replaced = replace_tracks(&source, target, MergeMode::Aiou);
        assert_eq!(frames_named(&replaced, "あ"), vec![0, 10, 20]);
        assert_eq!(frames_named(&replaced, "まばたき"), vec![3]);
    }

    #[test]
    fn test_non_replaced_channels_survive_alongside_source() {
        let mut target = MotionFile::new("Target");
        target.add_morph_frame("ウィンク", 5, 1.0);
        target.add_morph_frame("ウィンク", 15, 0.0);

        let mut source = MotionFile::new("Source");
        for frame in [0, 10, 20] {
            source.add_morph_frame("あ", frame, 0.9);
        }

        let merged = merge_tracks(&source, target, MergeMode::Aiou);
        let frames: Vec<u32> = merged.morph_frames.iter().map(|f| f.frame).collect();
        assert_eq!(frames, vec![0, 5, 10, 15, 20]);
    }

    #[test]
    fn test_duplicate_timestamps_preserved() {
        let mut target = MotionFile::new("Target");
        target.add_morph_frame("あ", 10, 1.0);
        let mut source = MotionFile::new("Source");
        source.add_morph_frame("あ", 10, 0.5);

        let merged = merge_tracks(&source, target, MergeMode::AllMouths);
        assert_eq!(merged.morph_frames.len(), 2);
        assert_eq!(merged.morph_frames[0].weight, 1.0);
        assert_eq!(merged.morph_frames[1].weight, 0.5);
    }

    #[test]
    fn test_all_mouths_leaves_eye_morphs() {
        let mut target = MotionFile::new("Target");
        target.add_morph_frame("にやり", 1, 1.0);
        target.add_morph_frame("まばたき", 2, 1.0);

        let mut source = MotionFile::new("Source");
        source.add_morph_frame("ん", 4, 0.3);
        source.add_morph_frame("まばたき", 6, 0.3);

        let merged = replace_tracks(&source, target, MergeMode::AllMouths);
        let names: Vec<&str> = merged.morph_frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["まばたき", "ん"]);
    }

    #[test]
    fn test_all_face_replaces_everything_but_bones() {
        let mut target = MotionFile::new("Target");
        target.add_morph_frame("まばたき", 2, 1.0);
        target.bone_frames.push(BoneFrame::new("頭", 0, [0.0; 3], [0.0, 0.0, 0.0, 1.0]));

        let mut source = MotionFile::new("Source");
        source.add_morph_frame("怒り", 4, 0.3);

        let merged = merge_tracks(&source, target, MergeMode::AllFace);
        assert_eq!(merged.morph_frames.len(), 1);
        assert_eq!(merged.morph_frames[0].name, "怒り");
        assert_eq!(merged.bone_frames.len(), 1);
        assert_eq!(merged.model_name, "Target");
    }
}
