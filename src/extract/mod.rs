//! Task extraction from transcripts via a chat-completion model.
//!
//! The model is asked for a bare JSON array. What it returns goes through
//! the recovery ladder in [`recovery`]; when nothing usable comes back the
//! whole transcript is folded into a single fallback task and the outcome
//! is marked degraded. Extraction therefore always yields at least one
//! task — only the request itself can fail.

pub mod recovery;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{ExtractedTask, Transcript};
use crate::error::{PipelineError, Result};

const SYSTEM_PROMPT: &str = r#"You are an AI assistant that extracts tasks and events from voice recordings.
Analyze the transcription and identify specific tasks, appointments, meetings, and events.

For each item, provide:
- title: A clear, concise title
- type: "task" or "event"
- description: Brief description
- date: If mentioned, use YYYY-MM-DD format, otherwise "today" or "tomorrow"
- time: If mentioned, use HH:MM format (24-hour), otherwise null
- priority: "low", "medium", or "high" based on urgency
- category: "work", "personal", "health", "shopping", "travel", or "other"

IMPORTANT: Return ONLY a valid JSON array. Do not include any other text, explanations, or markdown formatting.
Example format:
[
  {
    "title": "Practice guitar",
    "type": "task",
    "description": "Play guitar in the evening",
    "date": "today",
    "time": null,
    "priority": "medium",
    "category": "personal"
  }
]"#;

/// Low temperature keeps the JSON output consistent.
const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 1000;

/// What extraction produced. `degraded` means the model's output was
/// unusable and the tasks are the synthesized fallback.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub tasks: Vec<ExtractedTask>,
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct ExtractionEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ExtractionEngine {
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

    /// Extract tasks from a transcript. Errors only on request failure;
    /// unusable completions degrade to a fallback task instead.
    pub async fn extract(&self, transcript: &Transcript) -> Result<ExtractionOutcome> {
        let content = self.request_completion(&transcript.text).await?;
        Ok(Self::recover_or_fallback(&content, &transcript.text))
    }

    async fn request_completion(&self, transcript_text: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Extract tasks and events from this voice recording: \"{transcript_text}\"\n\n\
                         Return ONLY the JSON array, no additional text or formatting."
                    ),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::ExtractionRequestFailed {
                reason: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ExtractionRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(PipelineError::ExtractionRequestFailed {
                reason: format!("{status}: {body}"),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| PipelineError::ExtractionRequestFailed {
                reason: format!("unexpected response shape: {e}"),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::ExtractionRequestFailed {
                reason: "completion contained no choices".to_string(),
            })
    }

    /// Apply the recovery ladder; synthesize the fallback task if every
    /// strategy comes up empty.
    fn recover_or_fallback(content: &str, transcript_text: &str) -> ExtractionOutcome {
        match recovery::recover(content) {
            Some((tasks, strategy)) => {
                info!(count = tasks.len(), strategy, "extraction complete");
                ExtractionOutcome {
                    tasks,
                    degraded: false,
                }
            }
            None => {
                warn!("model output unusable, falling back to transcript task");
                ExtractionOutcome {
                    tasks: vec![ExtractedTask::fallback_from_transcript(transcript_text)],
                    degraded: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::DEFAULT_TITLE;

    #[test]
    fn test_usable_completion_is_not_degraded() {
        let outcome = ExtractionEngine::recover_or_fallback(
            r#"[{"title": "Buy milk"}]"#,
            "buy milk",
        );

        assert!(!outcome.degraded);
        assert_eq!(outcome.tasks[0].title, "Buy milk");
    }

    #[test]
    fn test_unusable_completion_degrades_to_fallback() {
        let outcome =
            ExtractionEngine::recover_or_fallback("no tasks found, sorry", "call mom tonight");

        assert!(outcome.degraded);
        assert_eq!(outcome.tasks.len(), 1);
        assert_eq!(outcome.tasks[0].title, DEFAULT_TITLE);
        assert_eq!(outcome.tasks[0].description, "call mom tonight");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "system",
                content: "x".to_string(),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["temperature"], 0.1);
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "[]"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "[]");
    }
}
