//! # take-audio
//!
//! Silence-gated audio capture that splits recordings into per-take files.
//!
//! `take-audio` listens to one or more input devices via CPAL and watches
//! each channel group for sound. When a channel rises above the noise
//! floor a new take file opens, with a configurable window of pre-roll
//! silence kept in front of the onset; when the channel falls silent for
//! long enough the take closes with exactly the configured post-roll of
//! trailing silence. Everything in between — short pauses, level dips —
//! stays inside the take.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use take_audio::{SilenceConfig, TakeRecorder};
//!
//! let session = TakeRecorder::builder()
//!     .output_dir("recordings")
//!     .silence(SilenceConfig {
//!         noise_floor_db: 60.0,
//!         stop_after_silence: 10.0,
//!         ..Default::default()
//!     })
//!     .on_event(|e| tracing::info!(?e, "recorder event"))
//!     .start()?;
//!
//! // Poll stats while recording runs in the background.
//! loop {
//!     std::thread::sleep(std::time::Duration::from_millis(250));
//!     for row in session.snapshots() {
//!         println!("{}: {} takes", row.channel, row.files_written);
//!     }
//! }
//!
//! session.stop()?;
//! ```
//!
//! ## Architecture
//!
//! - **Capture thread**: the CPAL callback copies each delivery, demuxes
//!   channel groups into owned [`Block`]s, and calls the channel writers
//!   directly — sink I/O is synchronous on this thread, so the hot path is
//!   kept to buffer math plus the actual byte write
//! - **Channel writer**: a per-group state machine that buffers silence,
//!   trims pre/post-roll, and drives take files through a [`TakeSink`]
//! - **Display side**: writers publish counters through atomics; a poll
//!   loop snapshots them into an [`Aggregator`] without ever blocking
//!   capture
//!
//! The segmentation engine ([`Block`], [`BlockBuffer`], [`SilencePolicy`],
//! [`ChannelWriter`]) has no hardware dependency and can be driven entirely
//! from tests via [`MemorySink`] and [`MockSource`].

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod block;
mod buffer;
mod builder;
mod config;
mod display;
mod error;
mod event;
mod session;
mod sink;
pub mod source;
mod writer;

pub use block::Block;
pub use buffer::BlockBuffer;
pub use builder::{RecorderBuilder, TakeRecorder};
pub use config::{FileFormat, SilenceConfig, SilencePolicy};
pub use display::{Aggregator, ChannelRow, ChannelSnapshot, Totals};
pub use error::{RecorderError, SinkError};
pub use event::{event_callback, EventCallback, RecorderEvent};
pub use session::Session;
pub use sink::{FileTakeSink, MemorySink, TakeHandle, TakeSink};
pub use source::{
    auto_groups, default_input_device_name, list_input_devices, CaptureDevice, ChannelGroup,
    MockSource,
};
pub use writer::{ChannelStats, ChannelWriter};
