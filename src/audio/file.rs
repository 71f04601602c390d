use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::info;

/// A WAV recording loaded for replay through a session
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
            anyhow::bail!(
                "Expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split into raw little-endian PCM chunks of `chunk_ms` milliseconds
    ///
    /// Sessions only ingest 16kHz mono, so anything else is rejected rather
    /// than resampled.
    pub fn pcm_chunks(&self, chunk_ms: u64) -> Result<Vec<Vec<u8>>> {
        if self.sample_rate != 16000 || self.channels != 1 {
            anyhow::bail!(
                "Expected 16kHz mono, got {}Hz {}ch",
                self.sample_rate,
                self.channels
            );
        }

        let samples_per_chunk =
            ((self.sample_rate as u64 * chunk_ms.max(1)) / 1000).max(1) as usize;

        Ok(self
            .samples
            .chunks(samples_per_chunk)
            .map(|chunk| chunk.iter().flat_map(|s| s.to_le_bytes()).collect())
            .collect())
    }
}
