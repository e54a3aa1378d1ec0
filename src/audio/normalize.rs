//! Format normalization in front of the transcription upload.
//!
//! Captures in a vendor-accepted container pass through byte-identical.
//! Anything else gets one re-encode attempt into canonical 16-bit mono WAV.
//! A capture that cannot be decoded is still passed through, with a warning
//! attached — the vendor gets the final say on whether it can transcribe it.

use tracing::warn;

use crate::domain::AudioCapture;
use crate::error::Result;

/// Result of normalizing one capture. `warning` is set when the capture
/// could not be brought into a known-good format and is being uploaded
/// as-is.
#[derive(Debug)]
pub struct NormalizeOutcome {
    pub capture: AudioCapture,
    pub warning: Option<String>,
}

/// Normalize a capture for upload.
pub fn normalize(capture: AudioCapture) -> Result<NormalizeOutcome> {
    if capture.media_type.is_vendor_accepted() {
        return Ok(NormalizeOutcome {
            capture,
            warning: None,
        });
    }

    match reencode_as_wav(&capture.bytes) {
        Ok(reencoded) => Ok(NormalizeOutcome {
            capture: reencoded,
            warning: None,
        }),
        Err(reason) => {
            let warning = format!(
                "unsupported audio format '{}', uploading as-is: {}",
                capture.media_type, reason
            );
            warn!("{warning}");
            Ok(NormalizeOutcome {
                capture,
                warning: Some(warning),
            })
        }
    }
}

/// Decode arbitrary PCM-in-WAV bytes and re-emit them as canonical 16-bit
/// mono WAV at the source rate.
fn reencode_as_wav(bytes: &[u8]) -> std::result::Result<AudioCapture, String> {
    let mut reader =
        hound::WavReader::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err("invalid WAV header".to_string());
    }

    let raw: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| e.to_string())?,
            bits @ 1..=32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| scale_to_i16(v, bits)))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| e.to_string())?,
            bits => return Err(format!("unsupported bit depth: {bits}")),
        },
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| e.to_string())?,
    };

    let mono = downmix_to_mono(&raw, spec.channels as usize);
    AudioCapture::from_pcm_samples(&mono, spec.sample_rate).map_err(|e| e.to_string())
}

fn scale_to_i16(value: i32, bits: u16) -> i16 {
    if bits > 16 {
        (value >> (bits - 16)) as i16
    } else if bits < 16 {
        (value << (16 - bits)) as i16
    } else {
        value as i16
    }
}

/// Mix interleaved multi-channel audio down to mono by averaging frames.
pub(crate) fn downmix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
#[cfg(feature = "cpal-audio")]
pub(crate) fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;

    fn make_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn capture_with_type(bytes: Vec<u8>, media_type: MediaType) -> AudioCapture {
        AudioCapture {
            bytes,
            media_type,
            file_name: "input.bin".to_string(),
            duration_secs: 0.0,
        }
    }

    #[test]
    fn test_accepted_format_passes_through_byte_identical() {
        let bytes = make_wav(16000, 1, &[1i16, 2, 3]);
        let capture = capture_with_type(bytes.clone(), MediaType::Wav);

        let outcome = normalize(capture).unwrap();

        assert!(outcome.warning.is_none());
        assert_eq!(outcome.capture.bytes, bytes);
    }

    #[test]
    fn test_webm_passes_through_without_reencode() {
        // Not actually WebM content, but the allow-list is extension-driven
        let capture = capture_with_type(vec![1u8, 2, 3], MediaType::Webm);

        let outcome = normalize(capture).unwrap();

        assert!(outcome.warning.is_none());
        assert_eq!(outcome.capture.bytes, vec![1u8, 2, 3]);
        assert_eq!(outcome.capture.media_type, MediaType::Webm);
    }

    #[test]
    fn test_unknown_extension_with_wav_content_is_reencoded() {
        // Stereo pairs: (100, 200), (300, 400) downmix to 150, 350
        let bytes = make_wav(44100, 2, &[100i16, 200, 300, 400]);
        let capture = capture_with_type(bytes, MediaType::Other);

        let outcome = normalize(capture).unwrap();

        assert!(outcome.warning.is_none());
        assert_eq!(outcome.capture.media_type, MediaType::Wav);

        let reader =
            hound::WavReader::new(std::io::Cursor::new(&outcome.capture.bytes)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 44100);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![150i16, 350]);
    }

    #[test]
    fn test_undecodable_capture_degrades_to_warning() {
        let capture = capture_with_type(b"definitely not audio".to_vec(), MediaType::Other);

        let outcome = normalize(capture).unwrap();

        let warning = outcome.warning.expect("expected a warning");
        assert!(warning.contains("unsupported audio format"));
        // Original bytes survive untouched
        assert_eq!(outcome.capture.bytes, b"definitely not audio".to_vec());
    }

    #[test]
    fn test_downmix_to_mono_averages_frames() {
        assert_eq!(
            downmix_to_mono(&[100i16, 200, 300, 400], 2),
            vec![150i16, 350]
        );
        assert_eq!(downmix_to_mono(&[-100i16, 100], 2), vec![0i16]);
        assert_eq!(downmix_to_mono(&[5i16, 6, 7], 1), vec![5i16, 6, 7]);
    }

    #[test]
    fn test_scale_to_i16_bit_depths() {
        assert_eq!(scale_to_i16(i32::from(i16::MAX), 16), i16::MAX);
        // 24-bit full scale maps to 16-bit full scale
        assert_eq!(scale_to_i16(0x7FFFFF, 24), 0x7FFF);
        // 8-bit half scale maps to 16-bit half scale
        assert_eq!(scale_to_i16(0x40, 8), 0x4000);
    }
}
