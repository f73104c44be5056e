//! Mock audio source for testing without hardware.

use crate::Block;

/// A mock source that generates synthetic audio as a sequence of blocks.
///
/// This allows exercising the full segmentation engine without audio
/// hardware, making it suitable for CI environments. Audio is accumulated
/// with the `generate_*` methods and then chunked into fixed-size blocks
/// the way a device callback would deliver them.
///
/// # Example
///
/// ```
/// use take_audio::MockSource;
///
/// let mut mock = MockSource::new(16000, 1, 160);
///
/// // 100ms of silence, then a 100ms 440Hz burst.
/// mock.generate_silence(100);
/// mock.generate_sine(440.0, 100);
///
/// let blocks = mock.into_blocks();
/// assert_eq!(blocks.len(), 20);
/// ```
pub struct MockSource {
    sample_rate: u32,
    channels: u16,
    block_frames: usize,
    samples: Vec<i16>,
}

impl MockSource {
    /// Creates a mock source delivering `block_frames` frames per block.
    pub fn new(sample_rate: u32, channels: u16, block_frames: usize) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            block_frames: block_frames.max(1),
            samples: Vec::new(),
        }
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples
            .extend(std::iter::repeat(0i16).take(num_samples));
    }

    /// Generates a sine wave at the given frequency for the given duration.
    pub fn generate_sine(&mut self, frequency: f64, duration_ms: u64) {
        let num_frames = self.samples_for_duration(duration_ms) / self.channels as usize;
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_frames {
            let t = i as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin();
            let sample = (value * 32767.0) as i16;

            // Write same sample to all channels
            for _ in 0..self.channels {
                self.samples.push(sample);
            }
        }
    }

    /// Generates white noise for the given duration.
    pub fn generate_noise(&mut self, duration_ms: u64, amplitude: f64) {
        let num_samples = self.samples_for_duration(duration_ms);
        let amplitude = (amplitude * 32767.0) as i16;

        // Simple LCG for deterministic "random" noise
        let mut seed: u32 = 12345;
        for _ in 0..num_samples {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let random = ((seed >> 16) as i32 - 32768) as i16;
            let sample = (i32::from(random) * i32::from(amplitude) / 32767) as i16;
            self.samples.push(sample);
        }
    }

    /// Adds raw interleaved samples directly.
    pub fn add_samples(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    /// Duration of the accumulated audio in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        let frames = self.samples.len() / self.channels as usize;
        (frames as u64 * 1000) / u64::from(self.sample_rate)
    }

    /// Chunks the accumulated samples into capture-sized blocks.
    ///
    /// The last block may be shorter than the configured size, the way a
    /// final device delivery can be.
    pub fn into_blocks(self) -> Vec<Block> {
        let chunk = self.block_frames * self.channels as usize;
        self.samples
            .chunks(chunk)
            .map(|c| Block::new(c.to_vec(), self.channels))
            .collect()
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * duration_ms / 1000) as usize;
        frames * self.channels as usize
    }
}
