// Integration tests for WAV replay input
//
// These tests write small WAV files with hound and verify that they are read
// back and sliced into raw PCM chunks a session can ingest.

use anyhow::Result;
use std::path::Path;
use tempfile::TempDir;
use voice_relay::audio::AudioFile;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(())
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("speech.wav");
    write_wav(&path, 16000, 1, &vec![100i16; 16000])?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 16000);
    assert!((audio.duration_seconds - 1.0).abs() < f64::EPSILON);
    assert!(audio.path.contains("speech.wav"));

    Ok(())
}

#[test]
fn test_pcm_chunks_cover_every_sample() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("ramp.wav");
    let samples: Vec<i16> = (0..20000).map(|i| (i % 3000) as i16 - 1500).collect();
    write_wav(&path, 16000, 1, &samples)?;

    let audio = AudioFile::open(&path)?;
    let chunks = audio.pcm_chunks(500)?;

    // 500ms at 16kHz = 8000 samples = 16000 bytes; 20000 samples -> 3 chunks
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].len(), 16000);
    assert_eq!(chunks[2].len(), 4000 * 2);

    let decoded: Vec<i16> = chunks
        .concat()
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(decoded, samples);

    Ok(())
}

#[test]
fn test_pcm_chunks_reject_other_formats() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("stereo.wav");
    write_wav(&path, 44100, 2, &vec![0i16; 4410])?;

    let audio = AudioFile::open(&path)?;
    assert!(audio.pcm_chunks(500).is_err());

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let result = AudioFile::open("/nonexistent/path/to/audio.wav");

    assert!(result.is_err(), "Opening nonexistent file should fail");
}
