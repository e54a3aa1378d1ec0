//! Audio input abstraction.
//!
//! The trait allows swapping implementations (real input device vs mock),
//! so the recorder and everything downstream can be tested without hardware.

use crate::error::{PipelineError, Result};

/// Default capture rate. 16kHz mono is what speech models expect.
pub const SAMPLE_RATE: u32 = 16_000;

/// A device that produces 16-bit PCM samples at [`SAMPLE_RATE`].
pub trait AudioSource: Send + Sync {
    /// Open the device and start capturing.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and release the device.
    fn stop(&mut self) -> Result<()>;

    /// Drain the samples captured since the last read.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    samples: Vec<i16>,
    deny_permission: bool,
    drained: bool,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 160],
            deny_permission: false,
            drained: false,
        }
    }

    /// Configure the samples the mock yields on its first read.
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock to refuse to start, like a denied microphone.
    pub fn with_permission_denied(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.deny_permission {
            return Err(PipelineError::PermissionDenied(
                "mock device refused access".to_string(),
            ));
        }
        self.is_started = true;
        self.drained = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.drained {
            return Ok(Vec::new());
        }
        self.drained = true;
        Ok(self.samples.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_start_stop_state() {
        let mut source = MockAudioSource::new();
        assert!(!source.is_started());

        source.start().unwrap();
        assert!(source.is_started());

        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_permission_denied() {
        let mut source = MockAudioSource::new().with_permission_denied();

        let err = source.start().unwrap_err();
        assert!(matches!(err, PipelineError::PermissionDenied(_)));
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_yields_samples_once() {
        let mut source = MockAudioSource::new().with_samples(vec![1i16, 2, 3]);
        source.start().unwrap();

        assert_eq!(source.read_samples().unwrap(), vec![1i16, 2, 3]);
        assert_eq!(source.read_samples().unwrap(), Vec::<i16>::new());
    }

    #[test]
    fn test_trait_is_object_safe() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_samples(vec![5i16; 10]));

        source.start().unwrap();
        assert_eq!(source.read_samples().unwrap().len(), 10);
        source.stop().unwrap();
    }
}
