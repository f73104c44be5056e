//! Configuration types: user-facing silence settings and the per-channel
//! policy derived from them.

use crate::RecorderError;

/// Full-scale peak-to-peak amplitude for 16-bit samples.
const FULL_SCALE_AMPLITUDE: f64 = u16::MAX as f64;

/// Output container for take files.
///
/// The set is closed: the sink for a writer is resolved from this tag once,
/// at writer construction, not per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// 16-bit PCM in a RIFF/WAVE container.
    #[default]
    Wav,
    /// Headerless interleaved little-endian 16-bit PCM.
    RawPcm,
}

impl FileFormat {
    /// File extension for this format, including the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => ".wav",
            Self::RawPcm => ".pcm",
        }
    }
}

/// User-facing silence-gating settings, in seconds and decibels.
///
/// Convert to frame units with [`at_rate`](SilenceConfig::at_rate) once the
/// channel's sample rate is known. Validation happens there; a writer is
/// never built from an invalid configuration.
///
/// # Example
///
/// ```
/// use take_audio::SilenceConfig;
///
/// let config = SilenceConfig {
///     stop_after_silence: 10.0,
///     ..Default::default()
/// };
/// let policy = config.at_rate(16000).unwrap();
/// assert_eq!(policy.stop_after_silence, 160_000);
/// ```
#[derive(Debug, Clone)]
pub struct SilenceConfig {
    /// Noise floor in dB below full scale. A block whose peak-to-peak
    /// amplitude reaches the corresponding level counts as sound.
    pub noise_floor_db: f64,

    /// Seconds of pre-roll silence retained before an onset.
    pub silence_before_start: f64,

    /// Seconds of post-roll silence retained after an offset.
    pub silence_after_end: f64,

    /// Maximum seconds of buffered silence while idle before the buffer is
    /// dropped.
    pub stop_after_silence: f64,

    /// Takes shorter than this many seconds are flagged when finalized.
    /// Zero disables the check.
    pub shortest_take: f64,

    /// A take reaching this many seconds is closed and a new one opened.
    /// Zero disables the cap.
    pub longest_take: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            noise_floor_db: 70.0,
            silence_before_start: 1.0,
            silence_after_end: 2.0,
            stop_after_silence: 20.0,
            shortest_take: 0.0,
            longest_take: 0.0,
        }
    }
}

impl SilenceConfig {
    /// Converts to frame units for a channel running at `sample_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidConfig`] for negative or non-finite
    /// durations, a noise floor outside the representable range, or a zero
    /// sample rate.
    pub fn at_rate(&self, sample_rate: u32) -> Result<SilencePolicy, RecorderError> {
        if sample_rate == 0 {
            return Err(RecorderError::invalid_config("sample rate must be non-zero"));
        }

        let durations = [
            ("silence_before_start", self.silence_before_start),
            ("silence_after_end", self.silence_after_end),
            ("stop_after_silence", self.stop_after_silence),
            ("shortest_take", self.shortest_take),
            ("longest_take", self.longest_take),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(RecorderError::invalid_config(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }

        if !self.noise_floor_db.is_finite() || self.noise_floor_db < 0.0 {
            return Err(RecorderError::invalid_config(format!(
                "noise_floor_db must be a non-negative attenuation, got {}",
                self.noise_floor_db
            )));
        }

        let frames = |secs: f64| (secs * f64::from(sample_rate)).round() as u64;
        let cap = |secs: f64| (secs > 0.0).then(|| frames(secs).max(1));

        let noise_floor_amplitude =
            (FULL_SCALE_AMPLITUDE * 10f64.powf(-self.noise_floor_db / 20.0)).round() as u32;

        Ok(SilencePolicy {
            noise_floor_amplitude,
            silence_before_start: frames(self.silence_before_start),
            silence_after_end: frames(self.silence_after_end),
            stop_after_silence: frames(self.stop_after_silence),
            shortest_take: cap(self.shortest_take),
            longest_take: cap(self.longest_take),
        })
    }
}

/// Silence policy in frame units, scoped to one channel's sample rate.
///
/// Derived once from a [`SilenceConfig`]; never recomputed per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilencePolicy {
    /// Minimum peak-to-peak amplitude, in i16 units, for a block to count
    /// as sound. Compared with `>=`: a block exactly at the floor is sound.
    pub noise_floor_amplitude: u32,
    /// Frames of pre-roll retained before an onset.
    pub silence_before_start: u64,
    /// Frames of post-roll retained after an offset.
    pub silence_after_end: u64,
    /// Maximum buffered silent frames while idle before the buffer drops.
    pub stop_after_silence: u64,
    /// Takes below this many frames are flagged when finalized.
    pub shortest_take: Option<u64>,
    /// Takes are rotated at this many frames.
    pub longest_take: Option<u64>,
}
