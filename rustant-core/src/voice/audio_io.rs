//! Audio I/O and format conversion utilities.
//!
//! Conversion helpers (f32↔i16, WAV encode/decode, resample, stereo→mono) are
//! always available. `AudioInput` and `AudioOutput` (cpal-based) require the
//! `voice` feature.

use crate::error::VoiceError;
use super::types::AudioChunk;

/// Audio conversion utilities — always available (no feature gate).
pub mod audio_convert {
    use super::*;

    /// Convert f32 samples (-1.0..1.0) to i16 samples.
    pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
        samples
            .iter()
            .map(|&s| {
                let clamped = s.clamp(-1.0, 1.0);
                (clamped * i16::MAX as f32) as i16
            })
            .collect()
    }

    /// Convert i16 samples to f32 samples (-1.0..1.0).
    pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
        samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }

    /// Resample audio using linear interpolation.
    pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }
        let ratio = from_rate as f64 / to_rate as f64;
        let out_len = ((samples.len() as f64) / ratio).ceil() as usize;
        let mut out = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;
            if idx + 1 < samples.len() {
                out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
            } else if idx < samples.len() {
                out.push(samples[idx]);
            }
        }
        out
    }

    /// Convert stereo interleaved samples to mono by averaging channels.
    pub fn stereo_to_mono(samples: &[f32]) -> Vec<f32> {
        samples
            .chunks(2)
            .map(|pair| {
                if pair.len() == 2 {
                    (pair[0] + pair[1]) / 2.0
                } else {
                    pair[0]
                }
            })
            .collect()
    }

    /// Encode an AudioChunk to WAV bytes using hound.
    pub fn encode_wav(chunk: &AudioChunk) -> Result<Vec<u8>, VoiceError> {
        let spec = hound::WavSpec {
            channels: chunk.channels,
            sample_rate: chunk.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(|e| {
                VoiceError::UnsupportedFormat {
                    format: format!("WAV write error: {}", e),
                }
            })?;
            let i16_samples = f32_to_i16(&chunk.samples);
            for sample in &i16_samples {
                writer.write_sample(*sample).map_err(|e| {
                    VoiceError::UnsupportedFormat {
                        format: format!("WAV sample write error: {}", e),
                    }
                })?;
            }
            writer.finalize().map_err(|e| {
                VoiceError::UnsupportedFormat {
                    format: format!("WAV finalize error: {}", e),
                }
            })?;
        }
        Ok(cursor.into_inner())
    }

    /// Decode WAV bytes to an AudioChunk using hound.
    pub fn decode_wav(data: &[u8]) -> Result<AudioChunk, VoiceError> {
        let cursor = std::io::Cursor::new(data);
        let mut reader = hound::WavReader::new(cursor).map_err(|e| {
            VoiceError::UnsupportedFormat {
                format: format!("WAV read error: {}", e),
            }
        })?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .map_err(|e| VoiceError::UnsupportedFormat {
                        format: format!("WAV sample read error: {}", e),
                    })?
            }
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| VoiceError::UnsupportedFormat {
                    format: format!("WAV float sample read error: {}", e),
                })?,
        };

        Ok(AudioChunk {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            timestamp: None,
        })
    }
}

// Feature-gated AudioInput / AudioOutput stubs.
// Real implementation would use cpal; we provide struct definitions
// behind the feature flag so they can be referenced.

/// Configuration for audio input capture.
#[cfg(feature = "voice")]
pub struct AudioInput {
    /// Optional device name (None = system default).
    pub device_name: Option<String>,
    /// Sample rate to request.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

#[cfg(feature = "voice")]
impl AudioInput {
    /// Create a new audio input configuration.
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Configuration for audio output playback.
#[cfg(feature = "voice")]
pub struct AudioOutput {
    /// Optional device name (None = system default).
    pub device_name: Option<String>,
}

#[cfg(feature = "voice")]
impl AudioOutput {
    /// Create a new audio output configuration.
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}
