//! CPAL device wrapper: builds the input stream that feeds channel writers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig as CpalStreamConfig};

use crate::source::ChannelGroup;
use crate::writer::ChannelWriter;
use crate::{Block, EventCallback, RecorderError, RecorderEvent};

/// Symmetric i16 max for audio conversion (avoids asymmetric clipping).
const I16_MAX_SYMMETRIC: f32 = i16::MAX as f32;
/// Minimum i16 as f32 for clamping.
const I16_MIN_F32: f32 = i16::MIN as f32;
/// Maximum i16 as f32 for clamping.
const I16_MAX_F32: f32 = i16::MAX as f32;

/// One channel group's destination within a capture stream.
#[derive(Clone)]
pub struct CaptureRoute {
    /// The device channels this route records.
    pub group: ChannelGroup,
    /// The writer that receives the group's blocks.
    pub writer: Arc<ChannelWriter>,
}

/// Demuxes one delivery into per-group blocks and hands them to the writers.
///
/// Runs on the capture thread; the extraction copies samples out of the
/// backend's shared buffer, so each writer owns its block. Empty deliveries
/// are dropped before they reach a writer. Write errors were already
/// handled by the writer (take aborted, event emitted); they are only
/// traced here.
pub(crate) fn dispatch(
    routes: &[CaptureRoute],
    interleaved: &[i16],
    device_channels: u16,
    timestamp: Duration,
) {
    if interleaved.is_empty() {
        return;
    }
    for route in routes {
        let samples = route.group.extract(interleaved, device_channels);
        if samples.is_empty() {
            continue;
        }
        let block = Block::new(samples, route.group.channels);
        if let Err(e) = route.writer.write(block, timestamp) {
            tracing::debug!(
                channel = %route.writer.channel_name(),
                error = %e,
                "take aborted during capture dispatch"
            );
        }
    }
}

/// Wrapper around a CPAL audio input device.
///
/// Handles device selection and stream construction; the built stream calls
/// the channel writers directly from the capture callback.
#[must_use]
pub struct CaptureDevice {
    device: Device,
}

impl CaptureDevice {
    /// Opens the default input device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultDevice` if no default input device is configured.
    pub fn open_default() -> Result<Self, RecorderError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(RecorderError::NoDefaultDevice)?;
        Ok(Self { device })
    }

    /// Opens a specific input device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, RecorderError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| RecorderError::Backend(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(Self { device });
                }
            }
        }

        Err(RecorderError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Returns the device's native capture format (sample rate, channels).
    pub fn native_config(&self) -> Result<(u32, u16), RecorderError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|e| RecorderError::Backend(e.to_string()))?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// Starts capturing and returns a running stream.
    ///
    /// The returned [`CaptureStream`] must be kept alive for capture to
    /// continue; dropping it stops the CPAL stream. Timestamps handed to
    /// the writers are measured from `session_start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be built or started.
    pub fn start_capture(
        &self,
        routes: Vec<CaptureRoute>,
        session_start: Instant,
        events: Option<EventCallback>,
    ) -> Result<CaptureStream, RecorderError> {
        let supported_config = self
            .device
            .default_input_config()
            .map_err(|e| RecorderError::Backend(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let device_channels = supported_config.channels();
        let cpal_config: CpalStreamConfig = supported_config.into();

        tracing::info!(
            device = %self.name(),
            channels = device_channels,
            sample_rate = cpal_config.sample_rate.0,
            format = ?sample_format,
            "starting capture"
        );

        let stream = match sample_format {
            SampleFormat::I16 => {
                self.build_i16_stream(&cpal_config, routes, device_channels, session_start, events)?
            }
            SampleFormat::F32 => {
                self.build_f32_stream(&cpal_config, routes, device_channels, session_start, events)?
            }
            format => {
                return Err(RecorderError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream
            .play()
            .map_err(|e| RecorderError::Backend(e.to_string()))?;

        Ok(CaptureStream {
            name: self.name(),
            _stream: stream,
        })
    }

    fn build_i16_stream(
        &self,
        config: &CpalStreamConfig,
        routes: Vec<CaptureRoute>,
        device_channels: u16,
        session_start: Instant,
        events: Option<EventCallback>,
    ) -> Result<Stream, RecorderError> {
        let device_name = self.name();
        let stream = self
            .device
            .build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    dispatch(&routes, data, device_channels, session_start.elapsed());
                },
                error_callback(device_name, events),
                None,
            )
            .map_err(|e| RecorderError::Backend(e.to_string()))?;

        Ok(stream)
    }

    fn build_f32_stream(
        &self,
        config: &CpalStreamConfig,
        routes: Vec<CaptureRoute>,
        device_channels: u16,
        session_start: Instant,
        events: Option<EventCallback>,
    ) -> Result<Stream, RecorderError> {
        let device_name = self.name();
        let stream = self
            .device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&sample| {
                            (sample * I16_MAX_SYMMETRIC).clamp(I16_MIN_F32, I16_MAX_F32) as i16
                        })
                        .collect();
                    dispatch(&routes, &converted, device_channels, session_start.elapsed());
                },
                error_callback(device_name, events),
                None,
            )
            .map_err(|e| RecorderError::Backend(e.to_string()))?;

        Ok(stream)
    }
}

/// CPAL error callback: log and surface as an event.
fn error_callback(
    device_name: String,
    events: Option<EventCallback>,
) -> impl FnMut(cpal::StreamError) {
    move |err| {
        tracing::error!(device = %device_name, "audio stream error: {err}");
        if let Some(ref callback) = events {
            callback(RecorderEvent::CaptureError {
                device: device_name.clone(),
                error: err.to_string(),
            });
        }
    }
}

/// A running audio capture stream.
///
/// Capture continues while this struct is held; dropping it stops the CPAL
/// stream and releases the device.
pub struct CaptureStream {
    name: String,
    /// The underlying CPAL stream. Dropping this stops capture.
    _stream: Stream,
}

impl CaptureStream {
    /// Name of the captured device.
    pub fn device_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::auto_groups;
    use crate::{MemorySink, SilencePolicy};

    fn test_writer(name: &str) -> Arc<ChannelWriter> {
        let policy = SilencePolicy {
            noise_floor_amplitude: 1,
            silence_before_start: 0,
            silence_after_end: 0,
            stop_after_silence: 1_000_000,
            shortest_take: None,
            longest_take: None,
        };
        Arc::new(ChannelWriter::new(
            name,
            policy,
            48_000,
            Box::new(MemorySink::new()),
            None,
        ))
    }

    #[test]
    fn test_dispatch_demuxes_groups() {
        let groups = auto_groups(3);
        let routes: Vec<CaptureRoute> = groups
            .iter()
            .map(|g| CaptureRoute {
                group: g.clone(),
                writer: test_writer(&g.name),
            })
            .collect();

        // Two frames of three channels, all loud.
        let interleaved = vec![10, 11, 12, 20, 21, 22];
        dispatch(&routes, &interleaved, 3, Duration::ZERO);

        assert_eq!(routes[0].writer.stats().samples_seen, 2);
        assert_eq!(routes[1].writer.stats().samples_seen, 2);
    }

    #[test]
    fn test_dispatch_drops_empty_delivery() {
        let groups = auto_groups(2);
        let routes = vec![CaptureRoute {
            group: groups[0].clone(),
            writer: test_writer("1-2"),
        }];

        dispatch(&routes, &[], 2, Duration::ZERO);
        assert_eq!(routes[0].writer.stats().samples_seen, 0);
    }

    #[test]
    fn test_dispatch_drops_partial_frame_only_delivery() {
        let groups = auto_groups(2);
        let routes = vec![CaptureRoute {
            group: groups[0].clone(),
            writer: test_writer("1-2"),
        }];

        // A single sample is less than one frame of a stereo device.
        dispatch(&routes, &[5], 2, Duration::ZERO);
        assert_eq!(routes[0].writer.stats().samples_seen, 0);
    }

    // Device tests require actual audio hardware and are skipped in CI.
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_device() {
        let device = CaptureDevice::open_default().unwrap();
        println!("Default device: {}", device.name());
    }
}
