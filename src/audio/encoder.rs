use anyhow::{anyhow, bail, Context, Result};
use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, MonoPcm, Quality};
use serde::Deserialize;
use tracing::{debug, warn};

/// Fixed-at-construction parameters of the MP3 archive encoder
#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Input channel count (only mono input is accepted)
    pub channels: u8,
    /// Output bitrate in kbps
    pub bitrate_kbps: u16,
    /// LAME quality level, 0 (best) to 9 (worst)
    pub quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bitrate_kbps: 128,
            quality: 2,
        }
    }
}

/// Compressed-audio accumulator
///
/// Turns raw 16-bit little-endian mono PCM into MP3 frames and keeps every
/// encoded byte, in feed order, until the session is finished.
pub struct Mp3Accumulator {
    encoder: Encoder,
    encoded: Vec<u8>,
    /// Trailing byte of an odd-length chunk, completed by the next chunk
    pending: Option<u8>,
    flushed: bool,
}

impl Mp3Accumulator {
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        if config.channels != 1 {
            bail!("Only mono input is supported, got {} channels", config.channels);
        }

        let mut builder = Builder::new().context("Failed to allocate LAME encoder")?;
        builder
            .set_num_channels(config.channels)
            .map_err(|e| anyhow!("Failed to set channels: {e:?}"))?;
        builder
            .set_sample_rate(config.sample_rate)
            .map_err(|e| anyhow!("Failed to set sample rate: {e:?}"))?;
        builder
            .set_brate(bitrate(config.bitrate_kbps)?)
            .map_err(|e| anyhow!("Failed to set bitrate: {e:?}"))?;
        builder
            .set_quality(quality(config.quality)?)
            .map_err(|e| anyhow!("Failed to set quality: {e:?}"))?;

        let encoder = builder
            .build()
            .map_err(|e| anyhow!("Failed to initialize LAME encoder: {e:?}"))?;

        Ok(Self {
            encoder,
            encoded: Vec::new(),
            pending: None,
            flushed: false,
        })
    }

    /// Encode one raw chunk and append the output to the archive
    ///
    /// Returns the incremental encoded bytes.
    pub fn feed(&mut self, pcm: &[u8]) -> Result<Vec<u8>> {
        if self.flushed {
            bail!("Encoder already flushed");
        }

        let samples = self.take_samples(pcm);
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut output =
            Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(samples.len()));
        let written = self
            .encoder
            .encode_to_vec(MonoPcm(samples.as_slice()), &mut output)
            .map_err(|e| anyhow!("LAME encode failed: {e:?}"))?;

        debug!("Encoded {} samples into {} bytes", samples.len(), written);
        self.encoded.extend_from_slice(&output);
        Ok(output)
    }

    /// Finalize the MP3 stream
    ///
    /// Returns the tail bytes, which are also appended to the archive. A second
    /// call is rejected.
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        if self.flushed {
            bail!("Encoder flushed twice");
        }
        self.flushed = true;

        if self.pending.take().is_some() {
            warn!("Discarding dangling PCM byte at end of stream");
        }

        // LAME emits at most one frame plus its internal buffer on flush
        let mut tail = Vec::with_capacity(7200);
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut tail)
            .map_err(|e| anyhow!("LAME flush failed: {e:?}"))?;

        self.encoded.extend_from_slice(&tail);
        Ok(tail)
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Everything encoded so far
    pub fn bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Move the archive out, leaving it empty
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.encoded)
    }

    fn take_samples(&mut self, pcm: &[u8]) -> Vec<i16> {
        let mut bytes = Vec::with_capacity(pcm.len() + 1);
        if let Some(byte) = self.pending.take() {
            bytes.push(byte);
        }
        bytes.extend_from_slice(pcm);

        if bytes.len() % 2 == 1 {
            self.pending = bytes.pop();
        }

        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

fn bitrate(kbps: u16) -> Result<Bitrate> {
    Ok(match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => bail!("Unsupported MP3 bitrate: {} kbps", other),
    })
}

fn quality(level: u8) -> Result<Quality> {
    Ok(match level {
        0 => Quality::Best,
        1 => Quality::SecondBest,
        2 => Quality::NearBest,
        3 => Quality::VeryNice,
        4 => Quality::Nice,
        5 => Quality::Good,
        6 => Quality::Decent,
        7 => Quality::Ok,
        8 => Quality::SecondWorst,
        9 => Quality::Worst,
        other => bail!("Unsupported LAME quality level: {}", other),
    })
}
