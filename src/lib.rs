//! voiceplan - Turn voice memos into calendar tasks
//!
//! A pipeline that takes a voice recording through four stages:
//! capture, transcription, task extraction, and calendar materialization.
//!
//! # Design
//!
//! Each stage degrades rather than aborts where a safe default exists:
//! - Unknown audio formats are re-encoded when possible and uploaded
//!   as-is with a warning when not
//! - Unparseable model output goes through a ladder of recovery
//!   strategies and bottoms out in a single fallback task built from the
//!   raw transcript
//! - Calendar dispatch is per-task, so one rejected event never blocks
//!   the rest of the batch
//!
//! # Modules
//!
//! - `audio`: capture devices, the recorder, format normalization
//! - `transcribe`: speech-to-text client
//! - `extract`: task extraction and JSON recovery
//! - `calendar`: materialization targets (local store, Google, links)
//! - `domain`: the session and task data structures
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Full pipeline over an existing recording
//! voiceplan run memo.wav
//!
//! # Pick which tasks to keep, then store them
//! voiceplan select 1,3
//! voiceplan add --to store
//! ```

pub mod audio;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod history;
pub mod transcribe;

// Re-export main types at crate root for convenience
pub use calendar::{CalendarEvent, CalendarTarget, DispatchReport};
pub use domain::{AudioCapture, Category, ExtractedTask, Priority, Session, TaskKind, Transcript};
pub use error::{PipelineError, Result};
pub use extract::{ExtractionEngine, ExtractionOutcome};
pub use transcribe::TranscriptionClient;
