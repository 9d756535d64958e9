use super::AudioBuffer;
use crate::error::{AppError, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{info, warn};

/// Load audio from file as interleaved f32
pub fn load_audio_file(path: &Path) -> Result<AudioBuffer> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => load_wav(path),
        "" => Err(AppError::Audio(format!(
            "Cannot determine audio format of {:?}",
            path
        ))),
        _ => decode_container(path, &extension),
    }
}

fn load_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = hound::WavReader::open(path).map_err(|e| AppError::Audio(e.to_string()))?;

    let spec = reader.spec();
    info!(
        "Loading WAV: {}Hz, {} channels, {:?}",
        spec.sample_rate, spec.channels, spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AppError::Audio(e.to_string()))?
        }
    };

    Ok(AudioBuffer::new(samples, spec.channels, spec.sample_rate))
}

/// Decode any container symphonia understands (mp3, flac, ogg, m4a, ...)
fn decode_container(path: &Path, extension: &str) -> Result<AudioBuffer> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AppError::Audio(format!("Unsupported audio format {}: {}", extension, e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::Audio("No supported audio tracks found in input".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AppError::Audio(format!("Unsupported codec: {}", e)))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(AppError::Audio(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(AppError::Audio(format!("Decoding failed: {}", e))),
        }
    }

    info!(
        "Decoded {}: {}Hz, {} channels, {} samples",
        extension,
        sample_rate,
        channels,
        samples.len()
    );

    Ok(AudioBuffer::new(samples, channels, sample_rate))
}

/// Export audio as 16-bit PCM WAV
pub fn write_wav(path: &Path, audio: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| AppError::Audio(e.to_string()))?;
    for &sample in &audio.samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| AppError::Audio(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| AppError::Audio(e.to_string()))?;

    Ok(())
}

/// Scale samples in place so the loudest one sits at +/-1
///
/// Returns the original peak.
pub fn normalize_peak(samples: &mut [f32]) -> Result<f32> {
    if samples.is_empty() {
        return Err(AppError::EmptyAudio);
    }
    let peak = samples.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    if peak == 0.0 {
        return Err(AppError::DegenerateSignal);
    }
    for sample in samples.iter_mut() {
        *sample /= peak;
    }
    Ok(peak)
}

/// Human readable length, e.g. "1 Hour, 2 Minutes, 5 Seconds"
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let hours = (total / 3600.0) as u64;
    let minutes = ((total % 3600.0) / 60.0) as u64;
    let secs = (total % 60.0) as u64;

    let plural = |n: u64| if n > 1 { "s" } else { "" };
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{} Hour{}", hours, plural(hours)));
    }
    if minutes > 0 {
        parts.push(format!("{} Minute{}", minutes, plural(minutes)));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{} Second{}", secs, plural(secs)));
    }
    parts.join(", ")
}

/// Processing time, e.g. "12.50 seconds" or "2 minutes and 3.00 seconds"
pub fn format_elapsed(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.2} seconds", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        format!("{} minutes and {:.2} seconds", minutes as u64, seconds - minutes * 60.0)
    }
}
