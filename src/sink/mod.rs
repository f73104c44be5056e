//! Sink traits and implementations for take output.
//!
//! A [`TakeSink`] allocates one destination per take; the returned
//! [`TakeHandle`] receives that take's samples and is finalized when the
//! take closes. The crate provides two built-in sinks:
//!
//! - [`FileTakeSink`]: writes each take to its own WAV or raw PCM file
//! - [`MemorySink`]: collects takes in memory, for tests and CI
//!
//! Implement [`TakeSink`] for custom destinations such as network uploads.

mod file;
mod memory;

pub use file::FileTakeSink;
pub use memory::MemorySink;

use std::path::PathBuf;

use crate::SinkError;

/// A factory for per-take destinations.
///
/// One sink is resolved per channel writer at construction time; the writer
/// calls [`open`](TakeSink::open) each time a new take starts.
///
/// # Implementation notes
///
/// - `open` takes `&self`; sinks are shared between the writer and tests
/// - All I/O is synchronous and runs on the capture thread; keep it to the
///   actual byte write
/// - Two takes opened within the same wall-clock second for the same
///   channel must still get distinct destinations
///
/// # Example
///
/// ```
/// use take_audio::{SinkError, TakeHandle, TakeSink};
///
/// struct NullSink;
/// struct NullHandle;
///
/// impl TakeSink for NullSink {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     fn open(&self, _channel: &str) -> Result<Box<dyn TakeHandle>, SinkError> {
///         Ok(Box::new(NullHandle))
///     }
/// }
///
/// impl TakeHandle for NullHandle {
///     fn write(&mut self, _samples: &[i16]) -> Result<(), SinkError> {
///         Ok(())
///     }
///
///     fn finalize(&mut self) -> Result<(), SinkError> {
///         Ok(())
///     }
///
///     fn bytes_written(&self) -> u64 {
///         0
///     }
/// }
/// ```
pub trait TakeSink: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Allocates a new destination for a take on the given channel.
    ///
    /// Fails with a [`SinkError`] if the destination cannot be created
    /// (unwritable path, exhausted disambiguators, ...). The writer surfaces
    /// the failure and stays idle; it does not retry.
    fn open(&self, channel_name: &str) -> Result<Box<dyn TakeHandle>, SinkError>;
}

/// A single open take destination.
pub trait TakeHandle: Send {
    /// Appends interleaved samples to the take.
    ///
    /// A failure aborts the take: the writer finalizes what exists and
    /// returns to idle.
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError>;

    /// Finalizes the destination (container metadata, flush).
    ///
    /// Idempotent: calling it again after success is a no-op.
    fn finalize(&mut self) -> Result<(), SinkError>;

    /// Bytes written to this take so far.
    fn bytes_written(&self) -> u64;

    /// Filesystem path of this take, when there is one.
    fn path(&self) -> Option<PathBuf> {
        None
    }
}
