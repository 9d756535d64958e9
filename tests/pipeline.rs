use std::f32::consts::PI;
use std::path::Path;
use vmd_lipsync::audio::{write_wav, PassthroughSeparator};
use vmd_lipsync::motion::{BoneFrame, MotionFile};
use vmd_lipsync::{
    convert_file, merge_tracks, optimize_motion, AudioBuffer, LipSyncConfig, MergeMode,
};

const RATE: u32 = 22050;

/// Alternating tone bursts and pauses, like short spoken phrases
fn phrases(path: &Path) {
    let mut samples = Vec::new();
    for (freq, seconds) in [(1000.0f32, 0.6f32), (0.0, 0.4), (2500.0, 0.6), (0.0, 0.4)] {
        let len = (seconds * RATE as f32) as usize;
        samples.extend((0..len).map(|i| 0.4 * (2.0 * PI * freq * i as f32 / RATE as f32).sin()));
    }
    write_wav(path, &AudioBuffer::mono(samples, RATE)).unwrap();
}

#[test]
fn audio_to_merged_motion() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("line.wav");
    phrases(&input);

    let config = LipSyncConfig::default().with_optimize(false);
    let report =
        convert_file(&input, dir.path(), "Talker", &config, &PassthroughSeparator).unwrap();
    assert_eq!(report.motion_files.len(), 1);

    let raw = MotionFile::load(&report.motion_files[0]).unwrap();
    // 2 seconds at 735-sample windows gives 60 frames, four vowels each
    assert_eq!(raw.morph_frames.len(), 60 * 4);
    assert!(raw.morph_frames.iter().all(|f| (0.0..=1.0).contains(&f.weight)));

    // Pauses close the mouth
    let closed = raw
        .morph_frames
        .iter()
        .filter(|f| (20..28).contains(&f.frame))
        .all(|f| f.weight == 0.0);
    assert!(closed);

    let optimized = optimize_motion(raw.clone(), &config.optimize_options());
    assert!(optimized.morph_frames.len() < raw.morph_frames.len());
    assert_eq!(optimized.morph_channel_names(), raw.morph_channel_names());

    // Splice into a dance motion that already carries bones and a blink
    let mut dance = MotionFile::new("Talker");
    dance
        .bone_frames
        .push(BoneFrame::new("センター", 0, [0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]));
    dance.add_morph_frame("まばたき", 12, 1.0);

    let merged = merge_tracks(&optimized, dance, MergeMode::Aiou);
    assert_eq!(merged.bone_frames.len(), 1);
    assert_eq!(merged.morph_frames.len(), optimized.morph_frames.len() + 1);
    let frames: Vec<u32> = merged.morph_frames.iter().map(|f| f.frame).collect();
    assert!(frames.windows(2).all(|w| w[0] <= w[1]));

    let path = dir.path().join("merged.vmd");
    merged.save(&path).unwrap();
    let reloaded = MotionFile::load(&path).unwrap();
    assert_eq!(reloaded, merged);
}
