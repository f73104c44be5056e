//! Error types for take-audio.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`RecorderError`]): prevent a recorder from being
//!   built or started
//! - **Sink errors** ([`SinkError`]): I/O failures while a take is open;
//!   they abort the current take but leave the writer usable

use std::path::PathBuf;

/// Fatal errors that prevent a recorder from being built or started.
///
/// These are returned from configuration conversion and from
/// [`RecorderBuilder::start()`]. Runtime I/O trouble on an open take is a
/// [`SinkError`] instead.
///
/// [`RecorderBuilder::start()`]: crate::RecorderBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// No default input device is configured on this system.
    #[error("no default input device configured")]
    NoDefaultDevice,

    /// The silence configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// The device's sample format is not supported.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// Device and channel selection left nothing to record.
    #[error("no channels selected for recording")]
    NoChannelsSelected,

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    Backend(String),
}

impl RecorderError {
    /// Creates an invalid-configuration error with the given reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Errors from a [`TakeSink`](crate::TakeSink) while a take is open.
///
/// A sink error aborts the current take: the handle is finalized
/// best-effort, the writer returns to idle, and the error is returned to
/// the caller synchronously. There is no automatic retry.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// File I/O error.
    #[error("file error: {path}: {source}")]
    FileError {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write-failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a file error for the given path.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_error_display() {
        let err = RecorderError::DeviceNotFound {
            name: "USB Mic".to_string(),
        };
        assert_eq!(err.to_string(), "device not found: USB Mic");
    }

    #[test]
    fn test_invalid_config_helper() {
        let err = RecorderError::invalid_config("bad floor");
        assert_eq!(err.to_string(), "invalid configuration: bad floor");
    }

    #[test]
    fn test_sink_error_custom() {
        let err = SinkError::custom("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_sink_error_write_failed() {
        let err = SinkError::write_failed("disk full");
        assert_eq!(err.to_string(), "write failed: disk full");
    }

    #[test]
    fn test_sink_error_file_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SinkError::file_error("/tmp/take.wav", io_err);
        assert!(err.to_string().contains("/tmp/take.wav"));
    }
}
