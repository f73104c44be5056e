//! File sink: one WAV or raw PCM file per take.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::sink::{TakeHandle, TakeSink};
use crate::{FileFormat, SinkError};

// WAV file format constants
// See: http://soundfile.sapp.org/doc/WaveFormat/

/// Byte offset of the file size field in WAV header (RIFF chunk size).
const WAV_FILE_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field in WAV header.
const WAV_DATA_SIZE_OFFSET: u64 = 40;

/// Size of the WAV header in bytes (RIFF + fmt + data chunk headers).
const WAV_HEADER_SIZE: usize = 44;

/// Size of the fmt chunk data (16 bytes for PCM).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const WAV_FORMAT_PCM: u16 = 1;

/// Bits per sample for 16-bit audio.
const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample (16-bit = 2 bytes).
const BYTES_PER_SAMPLE: u64 = 2;

/// Upper bound on the same-second collision counter.
const MAX_NAME_INDEX: u32 = 10_000;

/// A sink that writes each take to its own file under an output directory.
///
/// Files are named `{channel}-{yyyyMMdd-HHmmss}{ext}`, with a numeric
/// disambiguator appended when two takes for the same channel open within
/// the same wall-clock second: `{channel}-{yyyyMMdd-HHmmss}-{n}{ext}`.
///
/// For [`FileFormat::Wav`] a placeholder header is written on open and the
/// size fields are patched when the take is finalized; an unfinalized file
/// (crash, aborted take) is still mostly readable. [`FileFormat::RawPcm`]
/// writes interleaved little-endian samples with no container.
///
/// # Example
///
/// ```no_run
/// use take_audio::{FileFormat, FileTakeSink, TakeSink};
///
/// let sink = FileTakeSink::new("recordings", FileFormat::Wav, 48000, 2);
/// let handle = sink.open("1-2").unwrap();
/// ```
pub struct FileTakeSink {
    name: String,
    dir: PathBuf,
    format: FileFormat,
    sample_rate: u32,
    channels: u16,
}

impl FileTakeSink {
    /// Creates a file sink writing takes under `dir`.
    pub fn new(dir: impl AsRef<Path>, format: FileFormat, sample_rate: u32, channels: u16) -> Self {
        Self {
            name: format!("file:{}", dir.as_ref().display()),
            dir: dir.as_ref().to_path_buf(),
            format,
            sample_rate,
            channels,
        }
    }

    /// Picks a collision-free path for a take opened at `timestamp`.
    ///
    /// `timestamp` is the already-formatted `yyyyMMdd-HHmmss` stamp; the
    /// numeric disambiguator increments only while the candidate exists.
    fn allocate_path(&self, channel_name: &str, timestamp: &str) -> Result<PathBuf, SinkError> {
        let ext = self.format.extension();
        for index in 0..MAX_NAME_INDEX {
            let istr = if index == 0 {
                String::new()
            } else {
                format!("-{index}")
            };
            let candidate = self
                .dir
                .join(format!("{channel_name}-{timestamp}{istr}{ext}"));
            if !candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(SinkError::write_failed(format!(
            "no free take name for {channel_name}-{timestamp} after {MAX_NAME_INDEX} attempts"
        )))
    }

    /// Writes a complete WAV header with the given data size.
    fn write_wav_header(
        writer: &mut BufWriter<File>,
        sample_rate: u32,
        channels: u16,
        data_size: u32,
    ) -> std::io::Result<()> {
        // RIFF container header
        writer.write_all(b"RIFF")?;
        let file_size = WAV_HEADER_SIZE as u32 - 8 + data_size;
        writer.write_all(&file_size.to_le_bytes())?;
        writer.write_all(b"WAVE")?;

        // fmt subchunk (format specification)
        writer.write_all(b"fmt ")?;
        writer.write_all(&WAV_FMT_CHUNK_SIZE.to_le_bytes())?;
        writer.write_all(&WAV_FORMAT_PCM.to_le_bytes())?;
        writer.write_all(&channels.to_le_bytes())?;
        writer.write_all(&sample_rate.to_le_bytes())?;

        let bytes_per_sample = WAV_BITS_PER_SAMPLE / 8;
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bytes_per_sample);
        writer.write_all(&byte_rate.to_le_bytes())?;

        let block_align = channels * bytes_per_sample;
        writer.write_all(&block_align.to_le_bytes())?;
        writer.write_all(&WAV_BITS_PER_SAMPLE.to_le_bytes())?;

        // data subchunk header
        writer.write_all(b"data")?;
        writer.write_all(&data_size.to_le_bytes())?;

        Ok(())
    }

    /// Patches the WAV size fields after the data length is known.
    fn update_wav_header(writer: &mut BufWriter<File>, data_size: u32) -> std::io::Result<()> {
        let file_size = WAV_HEADER_SIZE as u32 - 8 + data_size;
        writer.seek(SeekFrom::Start(WAV_FILE_SIZE_OFFSET))?;
        writer.write_all(&file_size.to_le_bytes())?;

        writer.seek(SeekFrom::Start(WAV_DATA_SIZE_OFFSET))?;
        writer.write_all(&data_size.to_le_bytes())?;

        writer.seek(SeekFrom::End(0))?;

        Ok(())
    }
}

impl TakeSink for FileTakeSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, channel_name: &str) -> Result<Box<dyn TakeHandle>, SinkError> {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut path = self.allocate_path(channel_name, &timestamp)?;

        // A concurrent writer for another channel can't collide (names embed
        // the channel), but re-check at create time anyway.
        let file = loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    path = self.allocate_path(channel_name, &timestamp)?;
                }
                Err(e) => return Err(SinkError::file_error(&path, e)),
            }
        };

        let mut writer = BufWriter::new(file);
        let header_bytes = match self.format {
            FileFormat::Wav => {
                Self::write_wav_header(&mut writer, self.sample_rate, self.channels, 0)
                    .map_err(|e| SinkError::file_error(&path, e))?;
                WAV_HEADER_SIZE as u64
            }
            FileFormat::RawPcm => 0,
        };

        tracing::debug!(path = %path.display(), "opened take file");

        Ok(Box::new(FileTakeHandle {
            writer: Some(writer),
            path,
            format: self.format,
            samples_written: 0,
            header_bytes,
        }))
    }
}

/// An open take file.
struct FileTakeHandle {
    /// `None` once finalized.
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    format: FileFormat,
    samples_written: u64,
    header_bytes: u64,
}

impl TakeHandle for FileTakeHandle {
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SinkError::write_failed("take already finalized"));
        };
        for sample in samples {
            writer
                .write_all(&sample.to_le_bytes())
                .map_err(|e| SinkError::file_error(&self.path, e))?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        if self.format == FileFormat::Wav {
            let data_size = (self.samples_written * BYTES_PER_SAMPLE) as u32;
            FileTakeSink::update_wav_header(&mut writer, data_size)
                .map_err(|e| SinkError::file_error(&self.path, e))?;
        }
        writer
            .flush()
            .map_err(|e| SinkError::file_error(&self.path, e))?;

        tracing::debug!(
            path = %self.path.display(),
            samples = self.samples_written,
            "finalized take file"
        );
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.header_bytes + self.samples_written * BYTES_PER_SAMPLE
    }

    fn path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}
