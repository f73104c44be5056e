//! Display-facing aggregation of per-channel recording state.
//!
//! The aggregator is an explicitly constructed value owned by whoever runs
//! the display loop; it is fed by explicit [`merge`](Aggregator::merge)
//! calls and never feeds back into segmentation decisions.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::writer::ChannelStats;

/// One channel's state as of a poll, ready for display roll-up.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    /// Device the channel group belongs to.
    pub device: String,
    /// Channel group name ("1-2", "3", or an alias).
    pub channel: String,
    /// Whether a take is currently open.
    pub active: bool,
    /// Seconds of audio written to takes.
    pub recorded_seconds: f64,
    /// Bytes written across all takes.
    pub bytes_written: u64,
    /// Takes opened.
    pub files_written: u64,
    /// Smoothed volume in `0.0..=1.0`.
    pub volume: f32,
    /// Capture timestamp of the channel's most recent write; orders
    /// last-writer-wins updates.
    pub timestamp: Duration,
}

impl ChannelSnapshot {
    /// Builds a snapshot from a writer's counters.
    pub fn from_stats(
        device: impl Into<String>,
        channel: impl Into<String>,
        sample_rate: u32,
        stats: &ChannelStats,
    ) -> Self {
        let recorded_seconds = if sample_rate == 0 {
            0.0
        } else {
            stats.frames_recorded as f64 / f64::from(sample_rate)
        };
        Self {
            device: device.into(),
            channel: channel.into(),
            active: stats.active,
            recorded_seconds,
            bytes_written: stats.bytes_written,
            files_written: stats.files_written,
            volume: stats.volume,
            timestamp: stats.last_update,
        }
    }
}

/// A display row for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRow {
    /// Device name.
    pub device: String,
    /// Channel group name.
    pub channel: String,
    /// Whether a take is open.
    pub active: bool,
    /// Seconds recorded.
    pub recorded_seconds: f64,
    /// Bytes written.
    pub bytes_written: u64,
    /// Takes opened.
    pub files_written: u64,
    /// Smoothed volume.
    pub volume: f32,
}

/// Roll-up totals for a device or the whole session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    /// Seconds recorded, summed over channels.
    pub recorded_seconds: f64,
    /// Bytes written, summed over channels.
    pub bytes_written: u64,
    /// Takes opened, summed over channels.
    pub files_written: u64,
    /// Channels with an open take.
    pub active_channels: usize,
}

impl Totals {
    fn add(&mut self, snapshot: &ChannelSnapshot) {
        self.recorded_seconds += snapshot.recorded_seconds;
        self.bytes_written += snapshot.bytes_written;
        self.files_written += snapshot.files_written;
        if snapshot.active {
            self.active_channels += 1;
        }
    }
}

/// Merges per-channel snapshots into device and session roll-ups.
///
/// Counters in a snapshot are monotonic, so storing the latest snapshot per
/// channel and summing on demand is commutative and cannot double-count;
/// instantaneous fields (active flag, volume) follow last-writer-wins,
/// ordered by the snapshot timestamp. Merging never blocks a channel
/// writer — writers publish through atomics and the poll loop calls
/// `merge`.
///
/// # Example
///
/// ```
/// use take_audio::{Aggregator, ChannelSnapshot};
/// use std::time::Duration;
///
/// let aggregator = Aggregator::new();
/// aggregator.merge(ChannelSnapshot {
///     device: "Ext".into(),
///     channel: "1-2".into(),
///     active: true,
///     recorded_seconds: 1.5,
///     bytes_written: 132_344,
///     files_written: 2,
///     volume: 0.2,
///     timestamp: Duration::from_secs(3),
/// });
///
/// assert_eq!(aggregator.totals().files_written, 2);
/// ```
#[derive(Default)]
pub struct Aggregator {
    channels: Mutex<BTreeMap<(String, String), ChannelSnapshot>>,
}

impl Aggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one channel snapshot.
    ///
    /// A snapshot older than the stored one for the same (device, channel)
    /// is ignored; equal timestamps overwrite, so a channel that has not
    /// received audio yet still updates.
    pub fn merge(&self, snapshot: ChannelSnapshot) {
        let key = (snapshot.device.clone(), snapshot.channel.clone());
        let mut channels = self.channels.lock();
        let stale = channels
            .get(&key)
            .is_some_and(|existing| existing.timestamp > snapshot.timestamp);
        if !stale {
            channels.insert(key, snapshot);
        }
    }

    /// Session-wide totals over all merged channels.
    pub fn totals(&self) -> Totals {
        let channels = self.channels.lock();
        let mut totals = Totals::default();
        for snapshot in channels.values() {
            totals.add(snapshot);
        }
        totals
    }

    /// Per-device totals, sorted by device name.
    pub fn device_rows(&self) -> Vec<(String, Totals)> {
        let channels = self.channels.lock();
        let mut devices: BTreeMap<String, Totals> = BTreeMap::new();
        for snapshot in channels.values() {
            devices
                .entry(snapshot.device.clone())
                .or_default()
                .add(snapshot);
        }
        devices.into_iter().collect()
    }

    /// Per-channel rows, sorted by (device, channel).
    pub fn channel_rows(&self) -> Vec<ChannelRow> {
        let channels = self.channels.lock();
        channels
            .values()
            .map(|s| ChannelRow {
                device: s.device.clone(),
                channel: s.channel.clone(),
                active: s.active,
                recorded_seconds: s.recorded_seconds,
                bytes_written: s.bytes_written,
                files_written: s.files_written,
                volume: s.volume,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(device: &str, channel: &str, files: u64, at_secs: u64) -> ChannelSnapshot {
        ChannelSnapshot {
            device: device.to_string(),
            channel: channel.to_string(),
            active: false,
            recorded_seconds: files as f64,
            bytes_written: files * 100,
            files_written: files,
            volume: 0.0,
            timestamp: Duration::from_secs(at_secs),
        }
    }

    #[test]
    fn test_totals_sum_channels() {
        let aggregator = Aggregator::new();
        aggregator.merge(snapshot("Ext", "1-2", 2, 1));
        aggregator.merge(snapshot("Ext", "3", 1, 1));
        aggregator.merge(snapshot("Flow", "1-2", 4, 1));

        let totals = aggregator.totals();
        assert_eq!(totals.files_written, 7);
        assert_eq!(totals.bytes_written, 700);
        assert!((totals.recorded_seconds - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_remerge_does_not_double_count() {
        let aggregator = Aggregator::new();
        aggregator.merge(snapshot("Ext", "1-2", 2, 1));
        aggregator.merge(snapshot("Ext", "1-2", 3, 2));

        assert_eq!(aggregator.totals().files_written, 3);
    }

    #[test]
    fn test_stale_update_ignored() {
        let aggregator = Aggregator::new();
        aggregator.merge(snapshot("Ext", "1-2", 5, 10));
        aggregator.merge(snapshot("Ext", "1-2", 3, 4));

        assert_eq!(aggregator.totals().files_written, 5);
    }

    #[test]
    fn test_equal_timestamp_overwrites() {
        let aggregator = Aggregator::new();
        aggregator.merge(snapshot("Ext", "1-2", 1, 0));
        aggregator.merge(snapshot("Ext", "1-2", 2, 0));

        assert_eq!(aggregator.totals().files_written, 2);
    }

    #[test]
    fn test_device_rows_grouped_and_sorted() {
        let aggregator = Aggregator::new();
        aggregator.merge(snapshot("Flow", "1-2", 1, 1));
        aggregator.merge(snapshot("Ext", "1-2", 2, 1));
        aggregator.merge(snapshot("Ext", "3", 3, 1));

        let rows = aggregator.device_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "Ext");
        assert_eq!(rows[0].1.files_written, 5);
        assert_eq!(rows[1].0, "Flow");
        assert_eq!(rows[1].1.files_written, 1);
    }

    #[test]
    fn test_channel_rows_sorted() {
        let aggregator = Aggregator::new();
        aggregator.merge(snapshot("Ext", "3", 1, 1));
        aggregator.merge(snapshot("Ext", "1-2", 1, 1));

        let rows = aggregator.channel_rows();
        assert_eq!(rows[0].channel, "1-2");
        assert_eq!(rows[1].channel, "3");
    }

    #[test]
    fn test_active_channel_count() {
        let aggregator = Aggregator::new();
        let mut active = snapshot("Ext", "1-2", 1, 1);
        active.active = true;
        aggregator.merge(active);
        aggregator.merge(snapshot("Ext", "3", 1, 1));

        assert_eq!(aggregator.totals().active_channels, 1);
    }
}
