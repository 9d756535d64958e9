//! Keyframe reduction for morph and bone channels
//!
//! Each channel (frames sharing one name) is reduced on its own. The first
//! two and last two frames of a channel are always kept; interior frames
//! survive only if they carry information their neighbours don't.

use super::{BoneFrame, MorphFrame, MotionFile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Weight below which a morph is treated as closed
pub const NEAR_SILENT: f32 = 0.0099;

/// Default interpolation tolerance for bone channels
pub const DEFAULT_TOLERANCE: f32 = 0.005;

/// Tolerances for the bone interpolation check
///
/// 0.001 keeps nearly everything, 0.01 gives noticeably smaller files with
/// the same visual envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub position_tolerance: f32,
    pub rotation_tolerance: f32,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            position_tolerance: DEFAULT_TOLERANCE,
            rotation_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl OptimizeOptions {
    pub fn new(position_tolerance: f32, rotation_tolerance: f32) -> Self {
        Self {
            position_tolerance: position_tolerance.max(0.0),
            rotation_tolerance: rotation_tolerance.max(0.0),
        }
    }
}

/// Scalar keyframe test on a (current, previous, next) triple
pub fn is_keyframe(v0: f32, prev: f32, next: f32) -> bool {
    let extremum = (v0 > prev && v0 > next) || (v0 < prev && v0 < next);
    let falls_to_zero = v0 == 0.0 && (prev != 0.0 || next != 0.0);
    let full_weight_edge = v0 == 1.0 && (prev != 1.0 || next != 1.0);
    let leaves_silence = v0 < NEAR_SILENT
        && ((prev > NEAR_SILENT && prev > v0) || (next > NEAR_SILENT && next > v0));

    extremum || falls_to_zero || full_weight_edge || leaves_silence
}

/// Reduce one morph channel. Frames are expected to share a name.
pub fn optimize_morph_channel(frames: &[MorphFrame]) -> Vec<MorphFrame> {
    let sorted = sorted_by_frame(frames, |f| f.frame);
    reduce_channel(&sorted, |prev, cur, next| {
        let silent = prev.weight == 0.0 && cur.weight == 0.0 && next.weight == 0.0;
        !silent && is_keyframe(cur.weight, prev.weight, next.weight)
    })
}

/// Reduce one bone channel. Frames are expected to share a name.
pub fn optimize_bone_channel(frames: &[BoneFrame], options: &OptimizeOptions) -> Vec<BoneFrame> {
    let sorted = sorted_by_frame(frames, |f| f.frame);
    reduce_channel(&sorted, |prev, cur, next| {
        let components = |b: &BoneFrame| -> [f32; 7] {
            let [x, y, z] = b.position;
            let [qx, qy, qz, qw] = b.rotation;
            [x, y, z, qx, qy, qz, qw]
        };
        let (p, c, n) = (components(prev), components(cur), components(next));
        if (0..7).any(|k| is_keyframe(c[k], p[k], n[k])) {
            return true;
        }

        let span = next.frame as f32 - prev.frame as f32;
        let t = if span == 0.0 {
            0.0
        } else {
            (cur.frame as f32 - prev.frame as f32) / span
        };
        let lerp = |a: f32, b: f32| a + (b - a) * t;

        let position_off = (0..3).any(|k| {
            (lerp(prev.position[k], next.position[k]) - cur.position[k]).abs()
                > options.position_tolerance
        });
        let rotation_off = (0..4).any(|k| {
            (lerp(prev.rotation[k], next.rotation[k]) - cur.rotation[k]).abs()
                > options.rotation_tolerance
        });

        position_off || rotation_off
    })
}

/// Reduce every morph channel; channels appear in first-seen order
pub fn optimize_morphs(frames: &[MorphFrame]) -> Vec<MorphFrame> {
    group_by_name(frames, |f| f.name.as_str())
        .into_iter()
        .flat_map(|channel| optimize_morph_channel(&channel))
        .collect()
}

/// Reduce every bone channel; channels appear in first-seen order
pub fn optimize_bones(frames: &[BoneFrame], options: &OptimizeOptions) -> Vec<BoneFrame> {
    group_by_name(frames, |f| f.name.as_str())
        .into_iter()
        .flat_map(|channel| optimize_bone_channel(&channel, options))
        .collect()
}

/// Reduce the morph and bone tracks of a motion file
pub fn optimize_motion(mut motion: MotionFile, options: &OptimizeOptions) -> MotionFile {
    let morphs_before = motion.morph_frames.len();
    let bones_before = motion.bone_frames.len();

    motion.morph_frames = optimize_morphs(&motion.morph_frames);
    motion.bone_frames = optimize_bones(&motion.bone_frames, options);

    info!(
        "Optimized motion: morph frames {} -> {}, bone frames {} -> {}",
        morphs_before,
        motion.morph_frames.len(),
        bones_before,
        motion.bone_frames.len()
    );
    motion
}

/// Keep boundary frames plus every interior frame accepted by `keep`
fn reduce_channel<T: Clone>(frames: &[T], keep: impl Fn(&T, &T, &T) -> bool) -> Vec<T> {
    let n = frames.len();
    frames
        .iter()
        .enumerate()
        .filter(|&(i, _)| i < 2 || i + 2 >= n || keep(&frames[i - 1], &frames[i], &frames[i + 1]))
        .map(|(_, frame)| frame.clone())
        .collect()
}

fn sorted_by_frame<T: Clone>(frames: &[T], frame_of: impl Fn(&T) -> u32) -> Vec<T> {
    let mut sorted = frames.to_vec();
    sorted.sort_by_key(|f| frame_of(f));
    sorted
}

fn group_by_name<'a, T: Clone>(frames: &'a [T], name_of: impl Fn(&'a T) -> &'a str) -> Vec<Vec<T>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut channels: Vec<Vec<T>> = Vec::new();
    for frame in frames {
        let slot = *index.entry(name_of(frame)).or_insert_with(|| {
            channels.push(Vec::new());
            channels.len() - 1
        });
        channels[slot].push(frame.clone());
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, weights: &[f32]) -> Vec<MorphFrame> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| MorphFrame::new(name, i as u32, w))
            .collect()
    }

    fn frame_numbers(frames: &[MorphFrame]) -> Vec<u32> {
        frames.iter().map(|f| f.frame).collect()
    }

    #[test]
    fn test_predicate_rules() {
        assert!(is_keyframe(0.8, 0.2, 0.3)); // local max
        assert!(!is_keyframe(0.1, 0.2, 0.3));
        assert!(is_keyframe(0.1, 0.2, 0.15)); // local min
        assert!(is_keyframe(0.0, 0.0, 0.4)); // falling to zero edge
        assert!(is_keyframe(1.0, 1.0, 0.5)); // full weight edge
        assert!(!is_keyframe(1.0, 1.0, 1.0));
        assert!(is_keyframe(0.005, 0.005, 0.5)); // rising out of near-silence
        assert!(!is_keyframe(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_all_zero_channel_keeps_boundaries_only() {
        let frames = channel("あ", &[0.0; 12]);
        let reduced = optimize_morph_channel(&frames);
        assert_eq!(frame_numbers(&reduced), vec![0, 1, 10, 11]);
    }

    #[test]
    fn test_constant_channel_reduces_to_boundaries() {
        let frames = channel("い", &[0.5; 9]);
        let reduced = optimize_morph_channel(&frames);
        assert_eq!(frame_numbers(&reduced), vec![0, 1, 7, 8]);
    }

    #[test]
    fn test_short_channels_untouched() {
        for len in 0..5 {
            let frames = channel("う", &vec![0.0; len]);
            assert_eq!(optimize_morph_channel(&frames).len(), len);
        }
    }

    #[test]
    fn test_peak_is_kept_and_silence_dropped() {
        let frames = channel("お", &[0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
        let reduced = optimize_morph_channel(&frames);
        assert_eq!(frame_numbers(&reduced), vec![0, 1, 3, 4, 5, 7, 8]);
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let frames = channel("お", &[0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
        let once = optimize_morph_channel(&frames);
        let twice = optimize_morph_channel(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_boundary_frames_always_present() {
        let weights = [0.3, 0.31, 0.32, 0.33, 0.34, 0.35, 0.36, 0.37];
        let frames = channel("あ", &weights);
        let reduced = optimize_morph_channel(&frames);
        let kept = frame_numbers(&reduced);
        for boundary in [0, 1, 6, 7] {
            assert!(kept.contains(&boundary));
        }
        // Monotonic ramp has no interior keyframes
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_channels_reduced_independently() {
        let mut frames = channel("あ", &[0.0; 6]);
        frames.extend(channel("い", &[0.0, 0.0, 0.0, 0.7, 0.0, 0.0]));
        frames.push(MorphFrame::new("あ", 6, 0.0));

        let reduced = optimize_morphs(&frames);
        let a: Vec<u32> = reduced.iter().filter(|f| f.name == "あ").map(|f| f.frame).collect();
        let i: Vec<u32> = reduced.iter().filter(|f| f.name == "い").map(|f| f.frame).collect();

        assert_eq!(a, vec![0, 1, 5, 6]);
        assert_eq!(i, vec![0, 1, 2, 3, 4, 5]);
        // "あ" was seen first, so its channel comes first
        assert_eq!(reduced[0].name, "あ");
    }

    #[test]
    fn test_unsorted_channel_is_sorted_before_reduction() {
        let frames = vec![
            MorphFrame::new("あ", 4, 0.0),
            MorphFrame::new("あ", 0, 0.0),
            MorphFrame::new("あ", 2, 0.0),
            MorphFrame::new("あ", 1, 0.0),
            MorphFrame::new("あ", 3, 0.0),
        ];
        let reduced = optimize_morph_channel(&frames);
        assert_eq!(frame_numbers(&reduced), vec![0, 1, 3, 4]);
    }

    fn bone(frame: u32, x: f32) -> BoneFrame {
        BoneFrame::new("腕", frame, [x, 5.0, 7.0], [0.0, 0.0, 0.0, 1.0])
    }

    #[test]
    fn test_linear_bone_motion_collapses() {
        let frames: Vec<BoneFrame> = (0..10).map(|i| bone(i, 2.0 * i as f32 + 3.0)).collect();
        let reduced = optimize_bone_channel(&frames, &OptimizeOptions::default());
        let kept: Vec<u32> = reduced.iter().map(|b| b.frame).collect();
        assert_eq!(kept, vec![0, 1, 8, 9]);
    }

    #[test]
    fn test_bone_deviation_beyond_tolerance_is_kept() {
        // Uneven spacing keeps the motion linear in time
        let frames = vec![
            bone(0, 3.0),
            bone(1, 4.0),
            bone(3, 6.0),
            bone(4, 7.0),
            bone(6, 9.0),
            bone(7, 10.0),
        ];
        let reduced = optimize_bone_channel(&frames, &OptimizeOptions::default());
        assert_eq!(reduced.len(), 4);

        let mut bent = frames.clone();
        bent[2].rotation = [0.0, 0.02, 0.0, 1.0];
        let reduced = optimize_bone_channel(&bent, &OptimizeOptions::default());
        assert!(reduced.iter().any(|b| b.frame == 3));
    }

    #[test]
    fn test_bone_small_deviation_within_tolerance_dropped() {
        let mut frames: Vec<BoneFrame> = (0..6).map(|i| bone(i, 2.0 * i as f32 + 3.0)).collect();
        // Off the line by less than the tolerance, and not an extremum
        frames[2].position[0] += 0.001;
        let reduced = optimize_bone_channel(&frames, &OptimizeOptions::new(0.01, 0.01));
        assert!(!reduced.iter().any(|b| b.frame == 2));
    }

    #[test]
    fn test_optimize_motion_touches_only_tracks() {
        let mut motion = MotionFile::new("Model");
        motion.morph_frames = channel("あ", &[0.0; 8]);
        motion.bone_frames = (0..8).map(|i| bone(i, 2.0 * i as f32 + 3.0)).collect();
        motion.light_frames.push(crate::motion::OpaqueFrame([1u8; 28]));

        let optimized = optimize_motion(motion, &OptimizeOptions::default());
        assert_eq!(optimized.morph_frames.len(), 4);
        assert_eq!(optimized.bone_frames.len(), 4);
        assert_eq!(optimized.light_frames.len(), 1);
    }
}
