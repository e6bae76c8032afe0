//! Audio frame codec
//!
//! Pure conversions between the wire format (PCM 16-bit little-endian mono)
//! and the normalized `f32` sample domain the engines consume, plus WAV
//! container encoding and sample-rate conversion for outbound audio.

use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

/// Default session sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Decode raw PCM 16-bit little-endian bytes into normalized `f32` samples
///
/// Samples land in `[-1.0, 1.0]`. A trailing odd byte is ignored.
#[must_use]
pub fn pcm16le_to_f32(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
        .collect()
}

/// Encode normalized `f32` samples as PCM 16-bit little-endian bytes
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn f32_to_pcm16le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        out.extend_from_slice(&sample_i16.to_le_bytes());
    }
    out
}

/// Encode `f32` samples as a mono 16-bit WAV container
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Resample mono audio between sample rates using rubato
///
/// The tail is zero-padded up to the resampler chunk size so short utterances
/// are not truncated.
///
/// # Errors
///
/// Returns error if the resampler cannot be constructed or fails
#[allow(clippy::cast_possible_truncation)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();

    let mut output = Vec::new();
    for chunk in input.chunks(chunk_size) {
        let frame = if chunk.len() == chunk_size {
            chunk.to_vec()
        } else {
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        };

        let result = resampler
            .process(&[frame], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    // Trim the zero-padding back off the tail
    let expected = (samples.len() as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    output.truncate(expected);

    Ok(output.iter().map(|&s| s as f32).collect())
}
