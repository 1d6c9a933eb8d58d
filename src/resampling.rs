//! Module for converting heterogeneous sample data into a canonical mono float stream.
//!
//! Downsampling averages every run of input samples that maps onto the same
//! output index (a box filter). Upsampling duplicates the nearest earlier input
//! sample without interpolation. The asymmetry is intentional: it is cheap and
//! good enough for mixing sources into a waveform display.

use crate::format::encode_float_samples;
use crate::{AudioFormat, WaveResult, WaveformError};
use ndarray::{ArrayView2, Axis};

/// Resamples `data` from `source` into `target`.
///
/// When both formats are equal the bytes are returned unchanged. Otherwise the
/// target must be mono `Float32`; multi-channel input is averaged to mono first.
///
/// # Errors
/// Returns [`WaveformError::UnsupportedFormat`] if the formats differ and the
/// target is not mono float.
///
/// # Example
/// ```rust
/// use waveform_stream::{AudioFormat, resample};
/// use waveform_stream::format::encode_float_samples;
///
/// let source = AudioFormat::ieee_float(16000, 1).unwrap();
/// let target = AudioFormat::ieee_float(8000, 1).unwrap();
/// let bytes = encode_float_samples(&[1.0, 3.0, 5.0, 7.0]);
/// let resampled = resample(&source, &bytes, &target).unwrap();
/// assert_eq!(resampled, encode_float_samples(&[2.0, 6.0]));
/// ```
pub fn resample(source: &AudioFormat, data: &[u8], target: &AudioFormat) -> WaveResult<Vec<u8>> {
    if source == target {
        return Ok(data.to_vec());
    }
    if !target.is_mono_float() {
        return Err(WaveformError::unsupported_format(
            "resample",
            format!("{source} -> {target}"),
        ));
    }

    let samples = source.decode_samples(data);
    let mono = downmix(&samples, source.channels() as usize);
    let resampled = resample_mono(&mono, source.sample_rate(), target.sample_rate());
    tracing::trace!(%source, %target, input = mono.len(), output = resampled.len(), "resampled");
    Ok(encode_float_samples(&resampled))
}

/// Average interleaved frames of `channels` samples down to one sample per frame.
///
/// A trailing partial frame is ignored.
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let frames = samples.len() / channels;
    match ArrayView2::from_shape((frames, channels), &samples[..frames * channels]) {
        Ok(view) => view
            .mean_axis(Axis(1))
            .map(|mono| mono.to_vec())
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

/// Change the rate of a mono signal.
///
/// Input sample `i` maps to output index `floor(i * target / source)`.
/// Downsampling averages all inputs sharing an output index; upsampling emits
/// `round(n * target / source)` samples, each copying
/// `input[floor(j * source / target)]`.
pub fn resample_mono(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }
    let source = source_rate as u64;
    let target = target_rate as u64;

    if target < source {
        let capacity = (samples.len() as u64 * target / source) as usize + 1;
        let mut output = Vec::with_capacity(capacity);
        let mut bin = 0u64;
        let mut sum = 0.0f64;
        let mut count = 0usize;

        for (i, &sample) in samples.iter().enumerate() {
            let index = i as u64 * target / source;
            if index != bin {
                output.push((sum / count as f64) as f32);
                bin = index;
                sum = 0.0;
                count = 0;
            }
            sum += sample as f64;
            count += 1;
        }
        if count > 0 {
            output.push((sum / count as f64) as f32);
        }
        output
    } else {
        let last = samples.len() - 1;
        let output_len = (samples.len() as u64 * target + source / 2) / source;
        (0..output_len)
            .map(|j| samples[((j * source / target) as usize).min(last)])
            .collect()
    }
}

/// Converts sources of any supported format into canonical mono float samples
/// at one fixed rate, for mixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    target: AudioFormat,
}

impl Resampler {
    /// Create a resampler producing mono float audio at `target_rate` Hz.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if `target_rate` is zero.
    pub fn new(target_rate: u32) -> WaveResult<Self> {
        let target = AudioFormat::new(target_rate, 1, crate::SampleEncoding::Float32)?;
        Ok(Self { target })
    }

    /// The canonical output format.
    pub const fn target_format(&self) -> &AudioFormat {
        &self.target
    }

    /// Decode, downmix and resample `data` into canonical samples.
    pub fn to_canonical(&self, format: &AudioFormat, data: &[u8]) -> Vec<f32> {
        let samples = format.decode_samples(data);
        let mono = downmix(&samples, format.channels() as usize);
        resample_mono(&mono, format.sample_rate(), self.target.sample_rate())
    }

    /// Average several sources sample-by-sample into one canonical signal.
    ///
    /// The output is as long as the longest source; each output sample is the
    /// mean of the sources that still have audio at that index.
    pub fn mix(&self, sources: &[(AudioFormat, &[u8])]) -> Vec<f32> {
        let canonical: Vec<Vec<f32>> = sources
            .iter()
            .map(|(format, data)| self.to_canonical(format, data))
            .collect();
        let length = canonical.iter().map(Vec::len).max().unwrap_or(0);

        let mut sums = vec![0.0f32; length];
        let mut counts = vec![0u32; length];
        for signal in &canonical {
            for (i, &sample) in signal.iter().enumerate() {
                sums[i] += sample;
                counts[i] += 1;
            }
        }
        sums.iter()
            .zip(&counts)
            .map(|(&sum, &count)| sum / count.max(1) as f32)
            .collect()
    }
}
