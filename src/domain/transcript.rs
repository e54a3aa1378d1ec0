//! The immutable transcript produced by the transcription stage.

use serde::{Deserialize, Serialize};

/// A single transcription result plus the language hint used to produce it.
/// Created once by the transcription client, consumed by the extraction
/// engine, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,

    /// The BCP-47-like tag the caller asked for, if any. None means the
    /// vendor auto-detected the language.
    pub language_hint: Option<String>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, language_hint: Option<String>) -> Self {
        Self {
            text: text.into(),
            language_hint,
        }
    }
}
