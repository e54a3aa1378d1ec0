//! Captured audio and its declared media type.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Audio container/codec families the transcription vendor accepts.
///
/// Anything outside this set has to go through the format normalizer
/// before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Flac,
    M4a,
    Mp3,
    Mp4,
    Mpeg,
    Mpga,
    Oga,
    Ogg,
    Wav,
    Webm,
    /// Unknown or vendor-rejected encoding.
    Other,
}

impl MediaType {
    /// Map a file extension to a media type. Unknown extensions become
    /// `Other` and will be handled by the normalizer.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "flac" => Self::Flac,
            "m4a" => Self::M4a,
            "mp3" => Self::Mp3,
            "mp4" => Self::Mp4,
            "mpeg" => Self::Mpeg,
            "mpga" => Self::Mpga,
            "oga" => Self::Oga,
            "ogg" => Self::Ogg,
            "wav" | "wave" => Self::Wav,
            "webm" => Self::Webm,
            _ => Self::Other,
        }
    }

    /// MIME type sent with the multipart upload.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Flac => "audio/flac",
            Self::M4a => "audio/mp4",
            Self::Mp3 => "audio/mpeg",
            Self::Mp4 => "audio/mp4",
            Self::Mpeg | Self::Mpga => "audio/mpeg",
            Self::Oga | Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::Webm => "audio/webm",
            Self::Other => "application/octet-stream",
        }
    }

    /// Whether the transcription vendor accepts this encoding as-is.
    pub fn is_vendor_accepted(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Flac => "flac",
            Self::M4a => "m4a",
            Self::Mp3 => "mp3",
            Self::Mp4 => "mp4",
            Self::Mpeg => "mpeg",
            Self::Mpga => "mpga",
            Self::Oga => "oga",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
            Self::Webm => "webm",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// One finished recording: opaque bytes plus the declared media type and an
/// approximate duration. Session-scoped — consumed by the normalizer and not
/// retained once transcription succeeds.
#[derive(Debug, Clone)]
pub struct AudioCapture {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    /// Upload file name (the vendor sniffs the extension).
    pub file_name: String,
    /// Approximate duration in seconds; 0.0 when unknown.
    pub duration_secs: f64,
}

impl AudioCapture {
    /// Read an audio file from disk, tagging it with a media type inferred
    /// from the extension. Duration is read from the WAV header when the
    /// file is a WAV, otherwise left at 0.0.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let media_type = MediaType::from_extension(&ext);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("audio.{}", ext));

        let duration_secs = if media_type == MediaType::Wav {
            wav_duration(&bytes).unwrap_or(0.0)
        } else {
            0.0
        };

        Ok(Self {
            bytes,
            media_type,
            file_name,
            duration_secs,
        })
    }

    /// Encode raw PCM samples into a 16-bit mono WAV capture.
    pub fn from_pcm_samples(samples: &[i16], sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| PipelineError::AudioEncoding(e.to_string()))?;
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| PipelineError::AudioEncoding(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| PipelineError::AudioEncoding(e.to_string()))?;
        }

        Ok(Self {
            bytes: cursor.into_inner(),
            media_type: MediaType::Wav,
            file_name: "recording.wav".to_string(),
            duration_secs: samples.len() as f64 / sample_rate as f64,
        })
    }
}

/// Duration of a WAV payload from its header, if parseable.
fn wav_duration(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return None;
    }
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(MediaType::from_extension("wav"), MediaType::Wav);
        assert_eq!(MediaType::from_extension("WAV"), MediaType::Wav);
        assert_eq!(MediaType::from_extension("webm"), MediaType::Webm);
        assert_eq!(MediaType::from_extension("m4a"), MediaType::M4a);
        assert_eq!(MediaType::from_extension("aiff"), MediaType::Other);
        assert_eq!(MediaType::from_extension(""), MediaType::Other);
    }

    #[test]
    fn test_vendor_acceptance() {
        assert!(MediaType::Wav.is_vendor_accepted());
        assert!(MediaType::Webm.is_vendor_accepted());
        assert!(!MediaType::Other.is_vendor_accepted());
    }

    #[test]
    fn test_from_pcm_samples_produces_parseable_wav() {
        let samples = vec![0i16; 16000]; // 1 second at 16kHz
        let capture = AudioCapture::from_pcm_samples(&samples, 16000).unwrap();

        assert_eq!(capture.media_type, MediaType::Wav);
        assert!((capture.duration_secs - 1.0).abs() < 1e-9);

        let reader = hound::WavReader::new(std::io::Cursor::new(&capture.bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 16000);
    }

    #[test]
    fn test_wav_duration_of_garbage_is_none() {
        assert_eq!(wav_duration(b"not a wav file"), None);
    }
}
