//! Builder for a recording session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::sink::FileTakeSink;
use crate::source::{auto_groups, CaptureDevice, CaptureRoute};
use crate::writer::ChannelWriter;
use crate::{
    event_callback, EventCallback, FileFormat, RecorderError, RecorderEvent, Session, SilenceConfig,
};

/// Specifies which audio input device to record from.
#[derive(Debug, Clone, Default)]
pub(crate) enum DeviceSelection {
    /// Use the system's default input device.
    #[default]
    SystemDefault,
    /// Use a specific device by name.
    ByName(String),
}

/// Entry point for building a recording session.
///
/// # Example
///
/// ```no_run
/// use take_audio::{FileFormat, SilenceConfig, TakeRecorder};
///
/// let session = TakeRecorder::builder()
///     .output_dir("recordings")
///     .format(FileFormat::Wav)
///     .silence(SilenceConfig {
///         stop_after_silence: 10.0,
///         ..Default::default()
///     })
///     .on_event(|event| tracing::info!(?event, "recorder event"))
///     .start()
///     .unwrap();
///
/// // ... record ...
/// session.stop().unwrap();
/// ```
pub struct TakeRecorder;

impl TakeRecorder {
    /// Creates a builder with default settings: the system default input
    /// device, WAV output in the current directory, default silence gating.
    pub fn builder() -> RecorderBuilder {
        RecorderBuilder::default()
    }
}

/// Configures and starts a [`Session`].
pub struct RecorderBuilder {
    devices: Vec<DeviceSelection>,
    silence: SilenceConfig,
    output_dir: PathBuf,
    format: FileFormat,
    events: Option<EventCallback>,
}

impl Default for RecorderBuilder {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            silence: SilenceConfig::default(),
            output_dir: PathBuf::from("."),
            format: FileFormat::default(),
            events: None,
        }
    }
}

impl RecorderBuilder {
    /// Records from the system default input device.
    ///
    /// This is also the fallback when no device is added explicitly.
    #[must_use]
    pub fn default_device(mut self) -> Self {
        self.devices.push(DeviceSelection::SystemDefault);
        self
    }

    /// Records from a specific input device by name.
    ///
    /// May be called multiple times to record several devices at once;
    /// every device gets its own independent set of channel writers.
    #[must_use]
    pub fn device(mut self, name: impl Into<String>) -> Self {
        self.devices.push(DeviceSelection::ByName(name.into()));
        self
    }

    /// Sets the silence-gating configuration.
    #[must_use]
    pub fn silence(mut self, silence: SilenceConfig) -> Self {
        self.silence = silence;
        self
    }

    /// Sets the directory take files are written under.
    #[must_use]
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the output file format.
    #[must_use]
    pub fn format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Registers a callback for runtime events.
    ///
    /// The callback runs on capture threads and should return quickly.
    #[must_use]
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(RecorderEvent) + Send + Sync + 'static,
    {
        self.events = Some(event_callback(f));
        self
    }

    /// Resolves devices, builds one writer per channel group, and starts
    /// capturing.
    ///
    /// # Errors
    ///
    /// Fails if a device cannot be resolved, the silence configuration is
    /// invalid, no channel groups remain to record, or the audio backend
    /// refuses to start a stream.
    pub fn start(self) -> Result<Session, RecorderError> {
        let selections = if self.devices.is_empty() {
            vec![DeviceSelection::SystemDefault]
        } else {
            self.devices
        };

        let session_start = Instant::now();
        let mut channels = Vec::new();
        let mut streams = Vec::new();

        for selection in selections {
            let device = match selection {
                DeviceSelection::SystemDefault => CaptureDevice::open_default()?,
                DeviceSelection::ByName(name) => CaptureDevice::open_by_name(&name)?,
            };
            let device_name = device.name();
            let (sample_rate, device_channels) = device.native_config()?;

            // Scale the silence windows to this device's rate, once.
            let policy = self.silence.at_rate(sample_rate)?;

            let mut routes = Vec::new();
            for group in auto_groups(device_channels) {
                let sink =
                    FileTakeSink::new(&self.output_dir, self.format, sample_rate, group.channels);
                let writer = Arc::new(ChannelWriter::new(
                    group.name.clone(),
                    policy.clone(),
                    sample_rate,
                    Box::new(sink),
                    self.events.clone(),
                ));
                channels.push((device_name.clone(), writer.clone()));
                routes.push(CaptureRoute { group, writer });
            }

            if routes.is_empty() {
                tracing::warn!(device = %device_name, "device has no input channels, skipping");
                continue;
            }

            streams.push(device.start_capture(routes, session_start, self.events.clone())?);
        }

        if channels.is_empty() {
            return Err(RecorderError::NoChannelsSelected);
        }

        tracing::info!(
            channels = channels.len(),
            devices = streams.len(),
            "session started"
        );
        Ok(Session::new(session_start, channels, streams))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = TakeRecorder::builder();
        assert!(builder.devices.is_empty());
        assert_eq!(builder.format, FileFormat::Wav);
        assert_eq!(builder.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_builder_accumulates_devices() {
        let builder = TakeRecorder::builder().device("Ext").device("Flow");
        assert_eq!(builder.devices.len(), 2);
    }

    #[test]
    fn test_invalid_silence_rejected_before_capture() {
        // Validation order: a bad config must fail even when a device
        // exists, and device resolution failure is also acceptable in CI.
        let result = TakeRecorder::builder()
            .silence(SilenceConfig {
                silence_before_start: -1.0,
                ..Default::default()
            })
            .start();
        assert!(result.is_err());
    }

    // Requires audio hardware; run manually.
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_start_default_device() {
        let session = TakeRecorder::builder()
            .output_dir(std::env::temp_dir())
            .start()
            .unwrap();
        session.stop().unwrap();
    }
}
