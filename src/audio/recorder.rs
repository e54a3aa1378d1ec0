//! Recording state machine over an [`AudioSource`].
//!
//! Exactly one recording can be active at a time. `stop` always releases
//! the device, even when draining the last samples fails, so a failed stop
//! never wedges the microphone.

use tracing::{debug, warn};

use crate::audio::source::{AudioSource, SAMPLE_RATE};
use crate::domain::AudioCapture;
use crate::error::{PipelineError, Result};

pub struct Recorder {
    source: Box<dyn AudioSource>,
    sample_rate: u32,
    buffer: Vec<i16>,
    recording: bool,
}

impl Recorder {
    pub fn new(source: Box<dyn AudioSource>) -> Self {
        Self {
            source,
            sample_rate: SAMPLE_RATE,
            buffer: Vec::new(),
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start a new recording. Fails with `AlreadyRecording` if one is in
    /// progress, or `PermissionDenied` if the device refuses to open.
    pub fn start(&mut self) -> Result<()> {
        if self.recording {
            return Err(PipelineError::AlreadyRecording);
        }
        self.source.start()?;
        self.buffer.clear();
        self.recording = true;
        debug!(sample_rate = self.sample_rate, "recording started");
        Ok(())
    }

    /// Drain newly captured samples into the recording buffer. Call this
    /// periodically while a recording is active.
    pub fn poll(&mut self) -> Result<usize> {
        if !self.recording {
            return Err(PipelineError::NotRecording);
        }
        let samples = self.source.read_samples()?;
        let n = samples.len();
        self.buffer.extend(samples);
        Ok(n)
    }

    /// Stop the recording and encode the accumulated samples as a WAV
    /// capture. The device is released unconditionally.
    pub fn stop(&mut self) -> Result<AudioCapture> {
        if !self.recording {
            return Err(PipelineError::NotRecording);
        }
        self.recording = false;

        // Grab the tail of the stream before shutting the device down.
        let drain_result = self.source.read_samples();
        if let Err(e) = self.source.stop() {
            warn!("failed to release audio device cleanly: {e}");
        }
        self.buffer.extend(drain_result?);

        let samples = std::mem::take(&mut self.buffer);
        debug!(samples = samples.len(), "recording stopped");
        AudioCapture::from_pcm_samples(&samples, self.sample_rate)
    }
}
