//! Audio format description and PCM byte conversion.
//!
//! All sample bytes handled by this crate are interleaved little-endian frames,
//! the layout used by WAV files and most network PCM sources.

use crate::{WaveResult, WaveformError};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Encoding of a single sample inside an interleaved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// 16-bit signed integer PCM
    Pcm16,
    /// 24-bit signed integer PCM packed in three bytes
    Pcm24,
    /// 32-bit signed integer PCM
    Pcm32,
    /// 32-bit IEEE float in the range [-1.0, 1.0]
    Float32,
}

impl SampleEncoding {
    /// Size of one sample in bytes.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm16 => 2,
            Self::Pcm24 => 3,
            Self::Pcm32 | Self::Float32 => 4,
        }
    }

    /// Bit depth of one sample.
    pub const fn bits_per_sample(self) -> u16 {
        (self.bytes_per_sample() * 8) as u16
    }
}

/// Sample rate, channel count and encoding of a byte stream.
///
/// Immutable once a stream has been created for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    sample_rate: u32,
    channels: u16,
    encoding: SampleEncoding,
}

impl AudioFormat {
    /// Create a validated format.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if the sample rate or
    /// the channel count is zero.
    pub fn new(sample_rate: u32, channels: u16, encoding: SampleEncoding) -> WaveResult<Self> {
        if sample_rate == 0 {
            return Err(WaveformError::invalid_configuration(
                "sample_rate",
                "must be greater than zero",
            ));
        }
        if channels == 0 {
            return Err(WaveformError::invalid_configuration(
                "channels",
                "at least one channel is required",
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
            encoding,
        })
    }

    /// 32-bit float format, the canonical format for mixing.
    ///
    /// # Errors
    /// Same as [`AudioFormat::new`].
    pub fn ieee_float(sample_rate: u32, channels: u16) -> WaveResult<Self> {
        Self::new(sample_rate, channels, SampleEncoding::Float32)
    }

    /// 16-bit PCM format.
    ///
    /// # Errors
    /// Same as [`AudioFormat::new`].
    pub fn pcm16(sample_rate: u32, channels: u16) -> WaveResult<Self> {
        Self::new(sample_rate, channels, SampleEncoding::Pcm16)
    }

    /// Sample rate in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels.
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample encoding.
    pub const fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// Bytes occupied by one frame (one sample of every channel).
    pub const fn block_align(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }

    /// Bytes per second of audio.
    pub const fn average_bytes_per_second(&self) -> usize {
        self.block_align() * self.sample_rate as usize
    }

    /// True for single-channel float audio, the only resampler output format.
    pub const fn is_mono_float(&self) -> bool {
        self.channels == 1 && matches!(self.encoding, SampleEncoding::Float32)
    }

    /// Byte length of `duration`, rounded down to a whole number of frames.
    pub fn duration_to_bytes(&self, duration: Duration) -> usize {
        let frames = (duration.as_secs_f64() * self.sample_rate as f64 + 1e-9).floor();
        frames.to_usize().unwrap_or(0) * self.block_align()
    }

    /// Playback duration of `bytes` bytes.
    pub fn bytes_to_duration(&self, bytes: usize) -> Duration {
        Duration::from_secs_f64(bytes as f64 / self.average_bytes_per_second() as f64)
    }

    /// Decode interleaved bytes into normalised float samples.
    ///
    /// Integer encodings are scaled into [-1.0, 1.0). A trailing partial frame
    /// is ignored.
    pub fn decode_samples(&self, bytes: &[u8]) -> Vec<f32> {
        let whole = bytes.len() - bytes.len() % self.block_align();
        let bytes = &bytes[..whole];

        match self.encoding {
            SampleEncoding::Pcm16 => bytes
                .chunks_exact(2)
                .map(|b| normalise(i16::from_le_bytes([b[0], b[1]]), 16))
                .collect(),
            SampleEncoding::Pcm24 => bytes
                .chunks_exact(3)
                .map(|b| normalise(i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8, 24))
                .collect(),
            SampleEncoding::Pcm32 => bytes
                .chunks_exact(4)
                .map(|b| normalise(i32::from_le_bytes([b[0], b[1], b[2], b[3]]), 32))
                .collect(),
            SampleEncoding::Float32 => decode_float(bytes),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch {:?} @ {} Hz",
            self.channels, self.encoding, self.sample_rate
        )
    }
}

fn normalise<T: ToPrimitive>(value: T, bits: u32) -> f32 {
    let scale = (1u64 << (bits - 1)) as f64;
    (value.to_f64().unwrap_or(0.0) / scale) as f32
}

fn decode_float(bytes: &[u8]) -> Vec<f32> {
    if cfg!(target_endian = "little") {
        if let Ok(samples) = bytemuck::try_cast_slice::<u8, f32>(bytes) {
            return samples.to_vec();
        }
    }
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Encode float samples as little-endian Float32 bytes.
pub fn encode_float_samples(samples: &[f32]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice(samples).to_vec()
    } else {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}
