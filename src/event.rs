//! Runtime events for monitoring recorder behavior.
//!
//! Events are non-fatal notifications. The recorder keeps running after any
//! event is emitted; they exist for logging and metrics, not error handling.

use std::path::PathBuf;
use std::sync::Arc;

/// Runtime events emitted while recording.
///
/// Register an [`EventCallback`] to receive these. The callback runs on the
/// capture thread and should return quickly.
///
/// # Example
///
/// ```
/// use take_audio::RecorderEvent;
///
/// fn handle_event(event: RecorderEvent) {
///     match event {
///         RecorderEvent::TakeStarted { channel, path } => {
///             eprintln!("{channel}: new take {path:?}");
///         }
///         RecorderEvent::TakeFinished { channel, frames, bytes, .. } => {
///             eprintln!("{channel}: take done, {frames} frames / {bytes} bytes");
///         }
///         RecorderEvent::ShortTake { channel, frames, .. } => {
///             eprintln!("{channel}: short take ({frames} frames)");
///         }
///         RecorderEvent::BufferDropped { channel, frames } => {
///             eprintln!("{channel}: dropped {frames} silent frames");
///         }
///         RecorderEvent::SinkError { channel, error } => {
///             eprintln!("{channel}: sink error: {error}");
///         }
///         RecorderEvent::CaptureError { device, error } => {
///             eprintln!("{device}: capture error: {error}");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// A new take was opened for a channel.
    TakeStarted {
        /// Channel the take belongs to.
        channel: String,
        /// Output path, when the sink writes to the filesystem.
        path: Option<PathBuf>,
    },

    /// A take was finalized.
    TakeFinished {
        /// Channel the take belonged to.
        channel: String,
        /// Frames written to the take.
        frames: u64,
        /// Bytes written to the take.
        bytes: u64,
        /// Output path, when the sink writes to the filesystem.
        path: Option<PathBuf>,
    },

    /// A take was finalized below the configured shortest duration.
    ///
    /// The file is kept; this is a quality flag, not an error.
    ShortTake {
        /// Channel the take belonged to.
        channel: String,
        /// Frames in the short take.
        frames: u64,
        /// The configured minimum, in frames.
        shortest: u64,
    },

    /// Buffered idle silence exceeded the configured limit and was dropped.
    BufferDropped {
        /// Channel whose buffer was dropped.
        channel: String,
        /// Frames discarded.
        frames: u64,
    },

    /// A sink write or finalize failed; the current take was aborted.
    SinkError {
        /// Channel whose take was aborted.
        channel: String,
        /// Description of the error.
        error: String,
    },

    /// The capture layer reported an error for a device.
    CaptureError {
        /// Device that reported the error.
        device: String,
        /// Description of the error.
        error: String,
    },
}

/// Callback type for receiving runtime events.
///
/// # Example
///
/// ```ignore
/// let session = TakeRecorder::builder()
///     .on_event(|event| tracing::info!(?event, "recorder event"))
///     .start()?;
/// ```
pub type EventCallback = Arc<dyn Fn(RecorderEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use take_audio::{event_callback, RecorderEvent};
///
/// let callback = event_callback(|event| {
///     println!("got event: {event:?}");
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(RecorderEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_debug() {
        let event = RecorderEvent::BufferDropped {
            channel: "1-2".to_string(),
            frames: 4800,
        };
        let debug = format!("{event:?}");
        assert!(debug.contains("BufferDropped"));
        assert!(debug.contains("4800"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(RecorderEvent::BufferDropped {
            channel: "1".to_string(),
            frames: 0,
        });
        assert!(called.load(Ordering::SeqCst));
    }
}
