//! Integration tests for take-audio.
//!
//! The segmentation engine is driven end-to-end through the public API with
//! mock audio; tests that require actual audio hardware are marked with
//! `#[ignore]` and should be run manually.

use std::sync::Arc;
use std::time::Duration;

use take_audio::{
    Aggregator, Block, ChannelSnapshot, ChannelWriter, FileFormat, FileTakeSink, MemorySink,
    MockSource, SilenceConfig, TakeRecorder,
};

const SAMPLE_RATE: u32 = 16_000;
const BLOCK_FRAMES: usize = 160;

/// Silence windows used by the file-based scenarios: 50ms pre-roll, 100ms
/// post-roll, buffer drop after 500ms of idle silence.
fn config() -> SilenceConfig {
    SilenceConfig {
        noise_floor_db: 40.0,
        silence_before_start: 0.05,
        silence_after_end: 0.1,
        stop_after_silence: 0.5,
        ..Default::default()
    }
}

fn file_writer(dir: &std::path::Path) -> ChannelWriter {
    let policy = config().at_rate(SAMPLE_RATE).unwrap();
    let sink = FileTakeSink::new(dir, FileFormat::Wav, SAMPLE_RATE, 1);
    ChannelWriter::new("1", policy, SAMPLE_RATE, Box::new(sink), None)
}

fn feed(writer: &ChannelWriter, blocks: Vec<Block>) {
    let mut time = Duration::ZERO;
    for block in blocks {
        let frames = block.frames();
        writer.write(block, time).unwrap();
        time += Duration::from_secs_f64(frames as f64 / f64::from(SAMPLE_RATE));
    }
}

fn wav_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "wav"))
        .collect();
    files.sort();
    files
}

/// Reads the data chunk size from a WAV header.
fn wav_data_size(path: &std::path::Path) -> u32 {
    let data = std::fs::read(path).unwrap();
    u32::from_le_bytes([data[40], data[41], data[42], data[43]])
}

#[test]
fn test_single_burst_becomes_one_trimmed_take() {
    let dir = tempfile::tempdir().unwrap();
    let writer = file_writer(dir.path());

    // 1s of silence, a 200ms tone, 1s of silence.
    let mut mock = MockSource::new(SAMPLE_RATE, 1, BLOCK_FRAMES);
    mock.generate_silence(1000);
    mock.generate_sine(440.0, 200);
    mock.generate_silence(1000);

    feed(&writer, mock.into_blocks());
    writer.stop().unwrap();

    let files = wav_files(dir.path());
    assert_eq!(files.len(), 1);

    // 800 frames of pre-roll + 3200 of tone + 1600 of post-roll, 2 bytes
    // per sample: the long silent runs on either side were trimmed away.
    assert_eq!(wav_data_size(&files[0]), (800 + 3200 + 1600) * 2);

    // Pre-roll really is silence and the tone really is there.
    let data = std::fs::read(&files[0]).unwrap();
    let samples: Vec<i16> = data[44..]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert!(samples[..800].iter().all(|&s| s == 0));
    assert!(samples[800..4000].iter().any(|&s| s.abs() > 10_000));
    assert!(samples[4000..].iter().all(|&s| s == 0));
}

#[test]
fn test_two_bursts_become_two_files_with_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let writer = file_writer(dir.path());

    let mut mock = MockSource::new(SAMPLE_RATE, 1, BLOCK_FRAMES);
    mock.generate_sine(440.0, 100);
    mock.generate_silence(1000);
    mock.generate_sine(880.0, 100);

    feed(&writer, mock.into_blocks());
    writer.stop().unwrap();

    let files = wav_files(dir.path());
    assert_eq!(files.len(), 2);

    // Both takes typically open within the same wall-clock second, so the
    // names must differ by the numeric disambiguator.
    assert_ne!(files[0], files[1]);

    // First take: 1600 tone + 1600 post-roll. Second: 800 pre-roll + 1600
    // tone, flushed by stop before any post-roll accrued.
    let mut sizes: Vec<u32> = files.iter().map(|f| wav_data_size(f)).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![2400 * 2, 3200 * 2]);
}

#[test]
fn test_stop_twice_leaves_files_and_counters_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let writer = file_writer(dir.path());

    let mut mock = MockSource::new(SAMPLE_RATE, 1, BLOCK_FRAMES);
    mock.generate_sine(440.0, 100);

    feed(&writer, mock.into_blocks());
    writer.stop().unwrap();

    let files_before = wav_files(dir.path());
    let stats_before = writer.stats();

    writer.stop().unwrap();

    assert_eq!(wav_files(dir.path()), files_before);
    let stats_after = writer.stats();
    assert_eq!(stats_after.files_written, stats_before.files_written);
    assert_eq!(stats_after.blocks_written, stats_before.blocks_written);
    assert_eq!(stats_after.frames_recorded, stats_before.frames_recorded);
}

#[test]
fn test_long_session_rotates_at_duration_cap() {
    let dir = tempfile::tempdir().unwrap();
    let silence = SilenceConfig {
        longest_take: 1.0,
        ..config()
    };
    let policy = silence.at_rate(SAMPLE_RATE).unwrap();
    let sink = FileTakeSink::new(dir.path(), FileFormat::Wav, SAMPLE_RATE, 1);
    let writer = ChannelWriter::new("1", policy, SAMPLE_RATE, Box::new(sink), None);

    // 2.5s of continuous tone: two full 1s takes plus a 0.5s remainder.
    let mut mock = MockSource::new(SAMPLE_RATE, 1, BLOCK_FRAMES);
    mock.generate_sine(440.0, 2500);

    feed(&writer, mock.into_blocks());
    writer.stop().unwrap();

    let files = wav_files(dir.path());
    assert_eq!(files.len(), 3);

    let mut sizes: Vec<u32> = files.iter().map(|f| wav_data_size(f)).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![8_000 * 2, 16_000 * 2, 16_000 * 2]);
}

#[test]
fn test_engine_runs_hardware_free_via_memory_sink() {
    let policy = config().at_rate(SAMPLE_RATE).unwrap();
    let sink = MemorySink::new();
    let writer = Arc::new(ChannelWriter::new(
        "1-2",
        policy,
        SAMPLE_RATE,
        Box::new(sink.clone()),
        None,
    ));

    let mut mock = MockSource::new(SAMPLE_RATE, 2, BLOCK_FRAMES);
    mock.generate_silence(200);
    mock.generate_sine(440.0, 100);
    mock.generate_silence(400);

    feed(&writer, mock.into_blocks());
    writer.stop().unwrap();

    assert_eq!(sink.take_count(), 1);
    // Stereo: 800 pre-roll + 1600 tone + 1600 post-roll frames, 2 samples
    // per frame. The 200ms of leading silence is under the pre-roll window
    // only in part; 800 frames of it survive.
    assert_eq!(sink.takes()[0].len(), (800 + 1600 + 1600) * 2);
}

#[test]
fn test_snapshots_feed_display_aggregator() {
    let policy = config().at_rate(SAMPLE_RATE).unwrap();
    let sink = MemorySink::new();
    let writer = ChannelWriter::new("1", policy, SAMPLE_RATE, Box::new(sink), None);

    let mut mock = MockSource::new(SAMPLE_RATE, 1, BLOCK_FRAMES);
    mock.generate_sine(440.0, 100);
    feed(&writer, mock.into_blocks());

    let aggregator = Aggregator::new();
    aggregator.merge(ChannelSnapshot::from_stats(
        "Mock",
        writer.channel_name(),
        writer.sample_rate(),
        &writer.stats(),
    ));

    let rows = aggregator.channel_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].device, "Mock");
    assert_eq!(rows[0].channel, "1");
    assert!(rows[0].active);
    assert!(rows[0].volume > 0.0);

    let totals = aggregator.totals();
    assert_eq!(totals.files_written, 1);
    assert!((totals.recorded_seconds - 0.1).abs() < 1e-9);

    writer.stop().unwrap();
}

// Requires audio hardware; run manually.
#[test]
#[ignore = "requires audio hardware"]
fn test_record_from_default_device() {
    let dir = tempfile::tempdir().unwrap();
    let session = TakeRecorder::builder()
        .output_dir(dir.path())
        .start()
        .unwrap();

    std::thread::sleep(Duration::from_secs(2));
    session.stop().unwrap();
}
