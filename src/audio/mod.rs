//! Audio capture and format normalization.

#[cfg(feature = "cpal-audio")]
pub mod cpal_source;
pub mod normalize;
pub mod recorder;
pub mod source;

#[cfg(feature = "cpal-audio")]
pub use cpal_source::CpalAudioSource;
pub use normalize::{normalize, NormalizeOutcome};
pub use recorder::Recorder;
pub use source::{AudioSource, MockAudioSource, SAMPLE_RATE};
