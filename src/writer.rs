//! Per-channel writer: the silence-gated take segmentation state machine.
//!
//! A [`ChannelWriter`] consumes one channel group's blocks in capture order,
//! decides block by block whether a take is in progress, and drives the
//! take's file lifecycle through a [`TakeSink`]. The machine has two states,
//! idle (no take open) and recording (take open), plus a terminal stopped
//! state entered by [`stop`](ChannelWriter::stop).
//!
//! All mutation happens under the channel's exclusive lock; `write` runs on
//! the capture thread, `stop` may arrive from any thread. Counters are
//! published through atomics so the display side reads them without taking
//! the lock.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::sink::{TakeHandle, TakeSink};
use crate::{Block, BlockBuffer, EventCallback, RecorderEvent, SilencePolicy, SinkError};

/// Weight of the previous value in the smoothed volume level.
const VOLUME_SMOOTHING: f64 = 0.9;

/// What the latest block means for the channel, given the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// Sound while idle: a take starts.
    Onset,
    /// Sound while recording: keep writing.
    Sound,
    /// Silence while recording, post-roll still accruing.
    Pending,
    /// Silence while recording past the post-roll window: close the take.
    Offset,
    /// Idle silence past the limit: drop the buffer.
    Discard,
    /// Idle silence under the limit: keep buffering.
    Idle,
}

/// Classifies the situation after the latest block was appended.
///
/// `loud` is the latest block's amplitude test against the noise floor
/// (`>=`, so a block exactly at the floor is sound), `recording` is whether
/// a take is open, and `buffered` is the buffer's frame total including the
/// latest block.
fn classify(policy: &SilencePolicy, loud: bool, recording: bool, buffered: u64) -> Gate {
    match (loud, recording) {
        (true, false) => Gate::Onset,
        (true, true) => Gate::Sound,
        (false, true) if buffered <= policy.silence_after_end => Gate::Pending,
        (false, true) => Gate::Offset,
        (false, false) if buffered > policy.stop_after_silence => Gate::Discard,
        (false, false) => Gate::Idle,
    }
}

/// Counter snapshot for one channel writer.
///
/// Read from atomics; taking a snapshot never blocks the capture thread.
#[derive(Debug, Clone, Default)]
pub struct ChannelStats {
    /// Whether a take is currently open.
    pub active: bool,
    /// Frames accepted by `write`, recorded or not.
    pub samples_seen: u64,
    /// Blocks handed to the sink.
    pub blocks_written: u64,
    /// Takes opened.
    pub files_written: u64,
    /// Frames actually written to takes.
    pub frames_recorded: u64,
    /// Bytes written across all takes.
    pub bytes_written: u64,
    /// Smoothed volume in `0.0..=1.0`.
    pub volume: f32,
    /// Capture timestamp of the most recent write.
    pub last_update: Duration,
}

/// Atomic counters published by the writer.
#[derive(Default)]
struct Counters {
    active: AtomicBool,
    samples_seen: AtomicU64,
    blocks_written: AtomicU64,
    files_written: AtomicU64,
    frames_recorded: AtomicU64,
    bytes_written: AtomicU64,
    volume_bits: AtomicU32,
    last_update_micros: AtomicU64,
}

/// State guarded by the channel's exclusive lock.
struct WriterInner {
    /// Cleared by the first `stop`; writes observe it and return.
    running: bool,
    buffer: BlockBuffer,
    handle: Option<Box<dyn TakeHandle>>,
    /// Frames written to the open take.
    take_frames: u64,
    /// Bytes of takes already finalized.
    closed_bytes: u64,
    /// Smoothed volume, pre-publication.
    volume: f64,
}

/// Silence-gated writer for one channel group.
///
/// Exactly one writer exists per (device, channel group); the capture thread
/// calls [`write`](ChannelWriter::write) for every delivered block and a
/// control thread may call [`stop`](ChannelWriter::stop) at any time.
///
/// # Example
///
/// ```
/// use take_audio::{Block, ChannelWriter, MemorySink, SilenceConfig};
/// use std::time::Duration;
///
/// let policy = SilenceConfig::default().at_rate(48_000).unwrap();
/// let writer = ChannelWriter::new("1-2", policy, 48_000, Box::new(MemorySink::new()), None);
///
/// writer.write(Block::new(vec![0; 96], 2), Duration::ZERO).unwrap();
/// writer.stop().unwrap();
/// ```
pub struct ChannelWriter {
    channel_name: String,
    policy: SilencePolicy,
    sample_rate: u32,
    sink: Box<dyn TakeSink>,
    events: Option<EventCallback>,
    inner: Mutex<WriterInner>,
    counters: Counters,
}

impl ChannelWriter {
    /// Creates a writer for one channel group.
    ///
    /// `policy` arrives already validated (see
    /// [`SilenceConfig::at_rate`](crate::SilenceConfig::at_rate)); a writer
    /// is never constructed from an invalid configuration.
    pub fn new(
        channel_name: impl Into<String>,
        policy: SilencePolicy,
        sample_rate: u32,
        sink: Box<dyn TakeSink>,
        events: Option<EventCallback>,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            policy,
            sample_rate,
            sink,
            events,
            inner: Mutex::new(WriterInner {
                running: true,
                buffer: BlockBuffer::new(),
                handle: None,
                take_frames: 0,
                closed_bytes: 0,
                volume: 0.0,
            }),
            counters: Counters::default(),
        }
    }

    /// The channel group's display name.
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Sample rate this writer's policy was scaled to.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Consumes one block from the capture thread.
    ///
    /// Appends the block to the buffer, classifies the channel's situation
    /// against the silence policy, and performs the resulting take action.
    /// A no-op once the writer is stopped.
    ///
    /// # Errors
    ///
    /// A sink failure aborts the current take (the handle is finalized
    /// best-effort, the writer returns to idle) and is returned here; the
    /// writer stays usable for subsequent onsets.
    pub fn write(&self, block: Block, timestamp: Duration) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Ok(());
        }
        debug_assert!(
            !block.is_empty(),
            "empty blocks must be rejected at the capture boundary"
        );

        self.counters
            .samples_seen
            .fetch_add(block.frames(), Ordering::SeqCst);
        self.counters
            .last_update_micros
            .store(timestamp.as_micros() as u64, Ordering::SeqCst);

        let rms_fraction = (block.rms() / f64::from(i16::MAX)).min(1.0);
        inner.volume = VOLUME_SMOOTHING * inner.volume + (1.0 - VOLUME_SMOOTHING) * rms_fraction;
        self.counters
            .volume_bits
            .store((inner.volume as f32).to_bits(), Ordering::SeqCst);

        let loud = block.amplitude() >= self.policy.noise_floor_amplitude;
        let last_frames = block.frames();
        inner.buffer.append(block);

        let recording = inner.handle.is_some();
        match classify(&self.policy, loud, recording, inner.buffer.frames()) {
            Gate::Onset => {
                // Trim pre-roll: keep at most the configured window of
                // silence ahead of the onset block.
                let keep = self.policy.silence_before_start + last_frames;
                inner.buffer.clip(keep, true);
                let blocks = inner.buffer.drain();
                self.record(&mut inner, blocks)
            }
            Gate::Sound => {
                let blocks = inner.buffer.drain();
                self.record(&mut inner, blocks)
            }
            Gate::Pending | Gate::Idle => Ok(()),
            Gate::Offset => self.close_on_silence(&mut inner),
            Gate::Discard => {
                let dropped = inner.buffer.frames();
                inner.buffer.clear();
                tracing::debug!(
                    channel = %self.channel_name,
                    frames = dropped,
                    "dropped idle silence buffer"
                );
                self.emit(RecorderEvent::BufferDropped {
                    channel: self.channel_name.clone(),
                    frames: dropped,
                });
                Ok(())
            }
        }
    }

    /// Stops the writer, flushing any open take.
    ///
    /// Idempotent: the first call finalizes pending state, later calls (and
    /// any `write` racing past the lock) observe the cleared running flag
    /// and do nothing. An idle silence buffer is discarded, not written.
    pub fn stop(&self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Ok(());
        }
        inner.running = false;
        tracing::info!(channel = %self.channel_name, "channel writer stopping");

        if inner.handle.is_some() {
            let blocks = inner.buffer.drain();
            let recorded = self.record(&mut inner, blocks);
            let closed = self.close_take(&mut inner);
            recorded.and(closed)
        } else {
            inner.buffer.clear();
            Ok(())
        }
    }

    /// Returns a snapshot of this writer's counters without locking.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            active: self.counters.active.load(Ordering::SeqCst),
            samples_seen: self.counters.samples_seen.load(Ordering::SeqCst),
            blocks_written: self.counters.blocks_written.load(Ordering::SeqCst),
            files_written: self.counters.files_written.load(Ordering::SeqCst),
            frames_recorded: self.counters.frames_recorded.load(Ordering::SeqCst),
            bytes_written: self.counters.bytes_written.load(Ordering::SeqCst),
            volume: f32::from_bits(self.counters.volume_bits.load(Ordering::SeqCst)),
            last_update: Duration::from_micros(
                self.counters.last_update_micros.load(Ordering::SeqCst),
            ),
        }
    }

    /// Seconds of audio actually written to takes.
    pub fn recorded_seconds(&self) -> f64 {
        self.counters.frames_recorded.load(Ordering::SeqCst) as f64 / f64::from(self.sample_rate)
    }

    /// Offset: trim the buffered silence to the post-roll window, write the
    /// kept (oldest) portion, finalize the take.
    ///
    /// The trimmed-off newest silence stays buffered — it is the earliest
    /// candidate pre-roll for the next take.
    fn close_on_silence(&self, inner: &mut WriterInner) -> Result<(), SinkError> {
        let overshoot = inner.buffer.clip(self.policy.silence_after_end, false);
        let kept = inner.buffer.drain();
        let recorded = self.record(inner, kept);
        for block in overshoot {
            inner.buffer.append(block);
        }
        let closed = self.close_take(inner);
        recorded.and(closed)
    }

    /// Writes blocks to the open take, opening one lazily and rotating at
    /// the longest-take cap.
    fn record(&self, inner: &mut WriterInner, blocks: Vec<Block>) -> Result<(), SinkError> {
        for mut block in blocks {
            while !block.is_empty() {
                if inner.handle.is_none() {
                    self.open_take(inner)?;
                }
                let room = self
                    .policy
                    .longest_take
                    .map_or(u64::MAX, |cap| cap.saturating_sub(inner.take_frames));
                if room == 0 {
                    self.close_take(inner)?;
                    continue;
                }
                if block.frames() > room {
                    let (head, tail) = block.split(room);
                    self.write_block(inner, &head)?;
                    self.close_take(inner)?;
                    block = tail;
                } else {
                    self.write_block(inner, &block)?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Hands one block to the sink, aborting the take on failure.
    fn write_block(&self, inner: &mut WriterInner, block: &Block) -> Result<(), SinkError> {
        let Some(handle) = inner.handle.as_mut() else {
            return Err(SinkError::write_failed("no open take"));
        };
        if let Err(e) = handle.write(block.samples()) {
            self.abort_take(inner, &e);
            return Err(e);
        }
        inner.take_frames += block.frames();
        self.counters.blocks_written.fetch_add(1, Ordering::SeqCst);
        self.counters
            .frames_recorded
            .fetch_add(block.frames(), Ordering::SeqCst);
        self.publish_bytes(inner);
        Ok(())
    }

    fn open_take(&self, inner: &mut WriterInner) -> Result<(), SinkError> {
        match self.sink.open(&self.channel_name) {
            Ok(handle) => {
                let path = handle.path();
                tracing::info!(
                    channel = %self.channel_name,
                    path = ?path,
                    "take started"
                );
                inner.handle = Some(handle);
                inner.take_frames = 0;
                self.counters.files_written.fetch_add(1, Ordering::SeqCst);
                self.counters.active.store(true, Ordering::SeqCst);
                self.emit(RecorderEvent::TakeStarted {
                    channel: self.channel_name.clone(),
                    path,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    channel = %self.channel_name,
                    error = %e,
                    "failed to open take"
                );
                self.emit(RecorderEvent::SinkError {
                    channel: self.channel_name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn close_take(&self, inner: &mut WriterInner) -> Result<(), SinkError> {
        let Some(mut handle) = inner.handle.take() else {
            return Ok(());
        };
        let frames = inner.take_frames;
        let path = handle.path();
        let result = handle.finalize();
        let bytes = handle.bytes_written();
        inner.closed_bytes += bytes;
        inner.take_frames = 0;
        self.counters.active.store(false, Ordering::SeqCst);
        self.publish_bytes(inner);

        if let Some(shortest) = self.policy.shortest_take {
            if frames < shortest {
                tracing::warn!(
                    channel = %self.channel_name,
                    frames,
                    shortest,
                    "take shorter than configured minimum"
                );
                self.emit(RecorderEvent::ShortTake {
                    channel: self.channel_name.clone(),
                    frames,
                    shortest,
                });
            }
        }

        match result {
            Ok(()) => {
                tracing::info!(
                    channel = %self.channel_name,
                    frames,
                    bytes,
                    path = ?path,
                    "take finished"
                );
                self.emit(RecorderEvent::TakeFinished {
                    channel: self.channel_name.clone(),
                    frames,
                    bytes,
                    path,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    channel = %self.channel_name,
                    error = %e,
                    "failed to finalize take"
                );
                self.emit(RecorderEvent::SinkError {
                    channel: self.channel_name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Aborts the current take after a sink failure: finalize best-effort,
    /// drop pending blocks, return to idle. The partial file is kept.
    fn abort_take(&self, inner: &mut WriterInner, error: &SinkError) {
        tracing::warn!(
            channel = %self.channel_name,
            error = %error,
            "sink write failed, aborting take"
        );
        self.emit(RecorderEvent::SinkError {
            channel: self.channel_name.clone(),
            error: error.to_string(),
        });
        if let Some(mut handle) = inner.handle.take() {
            if let Err(e) = handle.finalize() {
                tracing::warn!(
                    channel = %self.channel_name,
                    error = %e,
                    "finalize after aborted take also failed"
                );
            }
            inner.closed_bytes += handle.bytes_written();
        }
        inner.take_frames = 0;
        inner.buffer.clear();
        self.counters.active.store(false, Ordering::SeqCst);
        self.publish_bytes(inner);
    }

    fn publish_bytes(&self, inner: &WriterInner) {
        let open = inner.handle.as_ref().map_or(0, |h| h.bytes_written());
        self.counters
            .bytes_written
            .store(inner.closed_bytes + open, Ordering::SeqCst);
    }

    fn emit(&self, event: RecorderEvent) {
        if let Some(ref callback) = self.events {
            callback(event);
        }
    }
}
