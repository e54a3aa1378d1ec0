//! Microphone capture backed by cpal. Compiled only with the `cpal-audio`
//! feature so the rest of the crate builds on machines without audio
//! hardware or ALSA headers.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::normalize::{downmix_to_mono, resample};
use crate::audio::source::{AudioSource, SAMPLE_RATE};
use crate::error::{PipelineError, Result};

/// cpal::Stream is !Send. Access is serialized through the Mutex in
/// `CpalAudioSource`, so the stream never crosses threads concurrently.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real microphone input. Prefers i16/16kHz/mono and falls back to the
/// device's native config with software downmix and resampling.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
}

impl CpalAudioSource {
    /// Open the named input device, or the system default when `None`.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|e| {
                    PipelineError::PermissionDenied(format!(
                        "failed to enumerate input devices: {e}"
                    ))
                })?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| {
                        PipelineError::PermissionDenied(format!(
                            "input device not found: {name}"
                        ))
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                PipelineError::PermissionDenied("no default input device".to_string())
            })?,
        };

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let preferred = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            tracing::warn!("audio stream error: {err}");
        };

        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(
                        data.iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                    );
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native()
    }

    /// Capture at the device's native config and convert in software.
    fn build_stream_native(&self) -> Result<cpal::Stream> {
        let default_config = self.device.default_input_config().map_err(|e| {
            PipelineError::PermissionDenied(format!(
                "failed to query default input config: {e}"
            ))
        })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let err_callback = |err| {
            tracing::warn!("audio stream error: {err}");
        };

        let buffer = Arc::clone(&self.buffer);
        match default_config.sample_format() {
            cpal::SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let mono = downmix_to_mono(data, native_channels);
                        let converted = resample(&mono, native_rate, SAMPLE_RATE);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| {
                    PipelineError::PermissionDenied(format!(
                        "failed to open native i16 stream: {e}"
                    ))
                }),
            cpal::SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let i16_data: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        let mono = downmix_to_mono(&i16_data, native_channels);
                        let converted = resample(&mono, native_rate, SAMPLE_RATE);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| {
                    PipelineError::PermissionDenied(format!(
                        "failed to open native f32 stream: {e}"
                    ))
                }),
            fmt => Err(PipelineError::PermissionDenied(format!(
                "unsupported native sample format: {fmt:?}"
            ))),
        }
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut guard = self
            .stream
            .lock()
            .map_err(|e| PipelineError::PermissionDenied(format!("stream lock poisoned: {e}")))?;
        if guard.is_some() {
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| {
            PipelineError::PermissionDenied(format!("failed to start audio stream: {e}"))
        })?;
        *guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut guard = self
            .stream
            .lock()
            .map_err(|e| PipelineError::PermissionDenied(format!("stream lock poisoned: {e}")))?;
        if let Some(stream) = guard.take() {
            stream.0.pause().map_err(|e| {
                PipelineError::PermissionDenied(format!("failed to stop audio stream: {e}"))
            })?;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|e| PipelineError::PermissionDenied(format!("buffer lock poisoned: {e}")))?;
        let samples = buffer.clone();
        buffer.clear();
        Ok(samples)
    }
}
