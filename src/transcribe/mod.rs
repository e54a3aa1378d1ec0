//! Speech-to-text over the vendor's transcription endpoint.
//!
//! The capture is uploaded as multipart form data. The vendor sniffs the
//! file extension, so the part carries both the capture's file name and its
//! MIME type. Vendor rejections are terminal for the session and surface
//! the vendor's error payload verbatim.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{AudioCapture, Transcript};
use crate::error::{PipelineError, Result};

/// Language tags offered in the session picker. Other tags are still sent
/// to the vendor, which may or may not accept them.
pub const KNOWN_LANGUAGES: &[&str] = &[
    "en-US", "es-ES", "fr-FR", "de-DE", "it-IT", "pt-BR", "ja-JP", "ko-KR", "zh-CN", "hi-IN",
];

/// Map a user-facing language tag to the hint the transcription model
/// understands. The default tag means "let the model auto-detect", and the
/// model takes bare primary subtags only.
pub fn whisper_language(tag: &str) -> Option<String> {
    if tag.eq_ignore_ascii_case("en-US") {
        return None;
    }
    let primary = tag.split('-').next().unwrap_or(tag);
    if primary.is_empty() {
        None
    } else {
        Some(primary.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct TranscriptionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl TranscriptionClient {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Transcribe one capture. `language` is the session's user-facing tag.
    pub async fn transcribe(
        &self,
        capture: &AudioCapture,
        language: &str,
    ) -> Result<Transcript> {
        if !KNOWN_LANGUAGES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(language))
        {
            warn!(tag = language, "language tag not in the known set, passing through");
        }

        let hint = whisper_language(language);
        debug!(
            file = %capture.file_name,
            bytes = capture.bytes.len(),
            hint = hint.as_deref().unwrap_or("auto"),
            "uploading capture for transcription"
        );

        let file_part = reqwest::multipart::Part::bytes(capture.bytes.clone())
            .file_name(capture.file_name.clone())
            .mime_str(capture.media_type.mime())
            .map_err(|e| PipelineError::TranscriptionFailed {
                reason: format!("invalid MIME type: {e}"),
            })?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());
        if let Some(lang) = &hint {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(self.api_url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::TranscriptionFailed {
                reason: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::TranscriptionFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(PipelineError::TranscriptionFailed {
                reason: format!("{status}: {body}"),
            });
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| PipelineError::TranscriptionFailed {
                reason: format!("unexpected response shape: {e}"),
            })?;

        info!(chars = parsed.text.len(), "transcription complete");
        Ok(Transcript::new(parsed.text, hint))
    }
}
