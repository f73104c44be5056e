//! Silence-split recording example.
//!
//! Records the default input device for 30 seconds, writing each burst of
//! sound to its own take file under `takes/`.
//!
//! Run with: cargo run --example record

use std::time::Duration;

use take_audio::{Aggregator, SilenceConfig, TakeRecorder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    std::fs::create_dir_all("takes")?;

    println!("Recording silence-split takes into takes/ for 30 seconds...");

    let session = TakeRecorder::builder()
        .output_dir("takes")
        .silence(SilenceConfig {
            noise_floor_db: 60.0,
            silence_before_start: 0.5,
            silence_after_end: 1.0,
            stop_after_silence: 10.0,
            ..Default::default()
        })
        .on_event(|event| tracing::info!(?event, "recorder event"))
        .start()?;

    let aggregator = Aggregator::new();
    for _ in 0..30 {
        std::thread::sleep(Duration::from_secs(1));
        session.merge_into(&aggregator);
        for row in aggregator.channel_rows() {
            let marker = if row.active { "*" } else { " " };
            println!(
                "{marker} {device}/{channel}: {takes} takes, {secs:.1}s, {bytes} bytes",
                device = row.device,
                channel = row.channel,
                takes = row.files_written,
                secs = row.recorded_seconds,
                bytes = row.bytes_written,
            );
        }
    }

    session.stop()?;

    let totals = aggregator.totals();
    println!(
        "Done: {} takes, {:.1}s recorded",
        totals.files_written, totals.recorded_seconds
    );

    Ok(())
}
