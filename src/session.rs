//! Recording session: lifecycle handle over writers and capture streams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::display::{Aggregator, ChannelSnapshot, Totals};
use crate::source::CaptureStream;
use crate::writer::ChannelWriter;
use crate::SinkError;

/// Handle to a running recording session.
///
/// Returned by [`RecorderBuilder::start()`]. Capture runs on the audio
/// backend's threads until [`stop()`](Session::stop) is called or the
/// session is dropped.
///
/// # Lifecycle
///
/// 1. Created by [`RecorderBuilder::start()`]
/// 2. Capture callbacks feed the channel writers in the background
/// 3. Call [`stop()`](Session::stop) for a graceful shutdown: open takes
///    are flushed and finalized
/// 4. Dropping the session also stops it (but prefer explicit `stop()`)
///
/// # Example
///
/// ```ignore
/// let session = TakeRecorder::builder()
///     .output_dir("recordings")
///     .start()?;
///
/// std::thread::sleep(Duration::from_secs(60));
/// session.stop()?;
/// ```
///
/// [`RecorderBuilder::start()`]: crate::RecorderBuilder::start
pub struct Session {
    running: AtomicBool,
    start: Instant,
    /// (device name, writer) per channel group.
    channels: Vec<(String, Arc<ChannelWriter>)>,
    /// Keeps capture alive; cleared on stop, which stops CPAL.
    streams: Mutex<Vec<CaptureStream>>,
}

impl Session {
    pub(crate) fn new(
        start: Instant,
        channels: Vec<(String, Arc<ChannelWriter>)>,
        streams: Vec<CaptureStream>,
    ) -> Self {
        Self {
            running: AtomicBool::new(true),
            start,
            channels,
            streams: Mutex::new(streams),
        }
    }

    /// Returns `true` until the session has been stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Gracefully stops the session.
    ///
    /// Capture streams are dropped first so no further blocks race the
    /// writer shutdown, then every writer is stopped independently (in any
    /// order; channels have no cross-ordering guarantee). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first sink error encountered while finalizing open
    /// takes; remaining writers are still stopped.
    pub fn stop(&self) -> Result<(), SinkError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("session stopping");

        self.streams.lock().clear();

        let mut first_error = None;
        for (_, writer) in &self.channels {
            if let Err(e) = writer.stop() {
                tracing::warn!(
                    channel = %writer.channel_name(),
                    error = %e,
                    "error finalizing channel on stop"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Snapshots every channel's counters for the display side.
    ///
    /// Reads writer atomics only; never blocks a capture thread.
    pub fn snapshots(&self) -> Vec<ChannelSnapshot> {
        self.channels
            .iter()
            .map(|(device, writer)| {
                ChannelSnapshot::from_stats(
                    device.clone(),
                    writer.channel_name(),
                    writer.sample_rate(),
                    &writer.stats(),
                )
            })
            .collect()
    }

    /// Merges the current snapshots into a display aggregator.
    pub fn merge_into(&self, aggregator: &Aggregator) {
        for snapshot in self.snapshots() {
            aggregator.merge(snapshot);
        }
    }

    /// Session-wide totals over all channels.
    pub fn totals(&self) -> Totals {
        let aggregator = Aggregator::new();
        self.merge_into(&aggregator);
        aggregator.totals()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_running() {
            // Dropped without an explicit stop: best-effort cleanup.
            if let Err(e) = self.stop() {
                tracing::warn!(error = %e, "error stopping session on drop");
            }
        }
    }
}
