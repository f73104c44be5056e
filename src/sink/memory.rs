//! In-memory sink for testing without a filesystem.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::sink::{TakeHandle, TakeSink};
use crate::SinkError;

/// A sink that collects each take's samples in memory.
///
/// This allows exercising the full segmentation engine without touching the
/// filesystem, making it suitable for CI and for asserting exactly which
/// samples each take received.
///
/// # Example
///
/// ```
/// use take_audio::{MemorySink, TakeSink};
///
/// let sink = MemorySink::new();
/// let mut handle = sink.open("1-2").unwrap();
/// handle.write(&[1, 2, 3]).unwrap();
/// handle.finalize().unwrap();
///
/// assert_eq!(sink.takes(), vec![vec![1, 2, 3]]);
/// ```
#[derive(Default, Clone)]
pub struct MemorySink {
    takes: Arc<Mutex<Vec<Vec<i16>>>>,
    /// Sink errors to inject, consumed one per write.
    fail_writes: Arc<Mutex<usize>>,
}

impl MemorySink {
    /// Creates an empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finalized and in-progress takes, oldest first.
    pub fn takes(&self) -> Vec<Vec<i16>> {
        self.takes.lock().clone()
    }

    /// Number of takes opened so far.
    pub fn take_count(&self) -> usize {
        self.takes.lock().len()
    }

    /// Makes the next `count` writes fail, for error-path tests.
    pub fn fail_next_writes(&self, count: usize) {
        *self.fail_writes.lock() = count;
    }
}

impl TakeSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self, _channel_name: &str) -> Result<Box<dyn TakeHandle>, SinkError> {
        let mut takes = self.takes.lock();
        takes.push(Vec::new());
        let index = takes.len() - 1;
        drop(takes);

        Ok(Box::new(MemoryTakeHandle {
            sink: self.clone(),
            index,
            bytes: 0,
            finalized: false,
        }))
    }
}

struct MemoryTakeHandle {
    sink: MemorySink,
    index: usize,
    bytes: u64,
    finalized: bool,
}

impl TakeHandle for MemoryTakeHandle {
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::write_failed("take already finalized"));
        }
        {
            let mut fail = self.sink.fail_writes.lock();
            if *fail > 0 {
                *fail -= 1;
                return Err(SinkError::write_failed("injected failure"));
            }
        }
        self.sink.takes.lock()[self.index].extend_from_slice(samples);
        self.bytes += samples.len() as u64 * 2;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        self.finalized = true;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_takes_in_order() {
        let sink = MemorySink::new();

        let mut a = sink.open("1").unwrap();
        a.write(&[1, 1]).unwrap();
        a.finalize().unwrap();

        let mut b = sink.open("1").unwrap();
        b.write(&[2]).unwrap();
        b.write(&[3]).unwrap();
        b.finalize().unwrap();

        assert_eq!(sink.takes(), vec![vec![1, 1], vec![2, 3]]);
    }

    #[test]
    fn test_injected_write_failure() {
        let sink = MemorySink::new();
        sink.fail_next_writes(1);

        let mut handle = sink.open("1").unwrap();
        assert!(handle.write(&[1]).is_err());
        assert!(handle.write(&[2]).is_ok());
    }

    #[test]
    fn test_bytes_written() {
        let sink = MemorySink::new();
        let mut handle = sink.open("1").unwrap();
        handle.write(&[1, 2, 3]).unwrap();
        assert_eq!(handle.bytes_written(), 6);
    }
}
