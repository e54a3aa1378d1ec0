//! Error taxonomy for the voice-to-task pipeline.
//!
//! Blocking failures (microphone access, transcription, the extraction
//! request itself) stop the pipeline and surface to the caller. Failures
//! with a safe default (unsupported audio format, unparseable model output,
//! per-task dispatch errors) are absorbed where they occur and degrade to a
//! worse-but-valid result instead.

use thiserror::Error;

/// Errors that can block forward progress of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Microphone access was denied or the input device could not be opened.
    /// Terminal for the capture attempt; the user must retry manually.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// `start()` was called while a recording is already in progress.
    #[error("recording already in progress")]
    AlreadyRecording,

    /// `stop()` was called with no recording in progress.
    #[error("no recording in progress")]
    NotRecording,

    /// The transcription vendor rejected the request. The reason carries the
    /// vendor's status and error payload verbatim. Terminal for the session.
    #[error("transcription failed: {reason}")]
    TranscriptionFailed { reason: String },

    /// The extraction request itself failed (network or vendor error) before
    /// any completion text was received. The recovery ladder only applies to
    /// text we actually got back.
    #[error("task extraction request failed: {reason}")]
    ExtractionRequestFailed { reason: String },

    /// Dispatching one task to a calendar target failed. Per-task and
    /// non-blocking: other tasks in the batch are still attempted.
    #[error("calendar dispatch failed for task {task_index}: {reason}")]
    CalendarDispatchFailed { task_index: usize, reason: String },

    #[error("audio encoding failed: {0}")]
    AudioEncoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
