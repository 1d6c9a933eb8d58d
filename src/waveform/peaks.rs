//! Windowed peak extraction, one-shot and incremental.

use crate::streaming::{StreamEvent, StreamingChannel, SubscriptionId};
use crate::waveform::summary::WaveformSummary;
use crate::{AudioFormat, WaveResult, WaveformError};
use ndarray::{ArrayView2, Axis, s};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Summary of one fixed-size window of samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakInfo {
    /// Lower bound of the window.
    pub min: f32,
    /// Upper bound of the window.
    pub max: f32,
}

impl PeakInfo {
    /// Create a peak from explicit bounds.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A peak spanning `-magnitude..=magnitude`.
    pub const fn symmetric(magnitude: f32) -> Self {
        Self {
            min: -magnitude,
            max: magnitude,
        }
    }

    /// Largest absolute bound.
    pub fn amplitude(&self) -> f32 {
        self.min.abs().max(self.max.abs())
    }
}

type CustomReducer = Arc<dyn Fn(&[f32]) -> PeakInfo + Send + Sync>;

/// Strategy reducing one window of samples to a [`PeakInfo`].
///
/// The magnitude reducers (`MaxAbs`, `Average`, `Rms`) produce symmetric peaks.
#[derive(Clone, Default)]
pub enum PeakReducer {
    /// Largest absolute sample.
    #[default]
    MaxAbs,
    /// Mean absolute sample.
    Average,
    /// Root mean square.
    Rms,
    /// Signed minimum and maximum.
    MinMax,
    /// Caller-provided reduction.
    Custom(CustomReducer),
}

impl PeakReducer {
    /// Wrap a closure as a reducer.
    pub fn custom<F>(reduce: F) -> Self
    where
        F: Fn(&[f32]) -> PeakInfo + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(reduce))
    }

    /// Reduce `window` to a peak. An empty window yields a zero peak.
    pub fn reduce(&self, window: &[f32]) -> PeakInfo {
        if window.is_empty() {
            return PeakInfo::default();
        }
        match self {
            Self::MinMax => {
                let (min, max) = window
                    .iter()
                    .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
                PeakInfo::new(min, max)
            }
            Self::Custom(reduce) => reduce(window),
            _ => PeakInfo::symmetric(self.magnitude(window)),
        }
    }

    /// Non-negative level of `window`, used for one side of a stereo peak.
    pub fn magnitude(&self, window: &[f32]) -> f32 {
        if window.is_empty() {
            return 0.0;
        }
        match self {
            Self::MaxAbs | Self::MinMax => window.iter().fold(0.0f32, |acc, s| acc.max(s.abs())),
            Self::Average => {
                (window.iter().map(|s| s.abs() as f64).sum::<f64>() / window.len() as f64) as f32
            }
            Self::Rms => {
                let mean_square =
                    window.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / window.len() as f64;
                mean_square.sqrt() as f32
            }
            Self::Custom(reduce) => reduce(window).max,
        }
    }
}

impl fmt::Debug for PeakReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxAbs => f.write_str("MaxAbs"),
            Self::Average => f.write_str("Average"),
            Self::Rms => f.write_str("Rms"),
            Self::MinMax => f.write_str("MinMax"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Reduces raw audio into `peaks_per_second` windows per second.
#[derive(Debug, Clone)]
pub struct PeakExtractor {
    peaks_per_second: u32,
    reducer: PeakReducer,
}

impl Default for PeakExtractor {
    fn default() -> Self {
        Self {
            peaks_per_second: 10,
            reducer: PeakReducer::MaxAbs,
        }
    }
}

impl PeakExtractor {
    /// Create an extractor.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if `peaks_per_second` is zero.
    pub fn new(peaks_per_second: u32, reducer: PeakReducer) -> WaveResult<Self> {
        if peaks_per_second == 0 {
            return Err(WaveformError::invalid_configuration(
                "peaks_per_second",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            peaks_per_second,
            reducer,
        })
    }

    /// Peaks produced per second of audio.
    pub const fn peaks_per_second(&self) -> u32 {
        self.peaks_per_second
    }

    /// The window reducer.
    pub const fn reducer(&self) -> &PeakReducer {
        &self.reducer
    }

    /// Interleaved samples per window: `sample_rate * channels / peaks_per_second`,
    /// rounded down to whole frames.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if the format is too slow
    /// for the requested peak rate and a window would be empty.
    pub fn window_size(&self, format: &AudioFormat) -> WaveResult<usize> {
        let frames = (format.sample_rate() / self.peaks_per_second) as usize;
        if frames == 0 {
            return Err(WaveformError::invalid_configuration(
                "peaks_per_second",
                format!(
                    "{} peaks per second exceeds the {} Hz sample rate",
                    self.peaks_per_second,
                    format.sample_rate()
                ),
            ));
        }
        Ok(frames * format.channels() as usize)
    }

    /// Reduce every full window of `data`; a trailing partial window is dropped.
    ///
    /// # Errors
    /// Fails if [`Self::window_size`] does.
    pub fn extract(&self, format: &AudioFormat, data: &[u8]) -> WaveResult<Vec<PeakInfo>> {
        let window = self.window_size(format)?;
        let samples = format.decode_samples(data);
        let peaks: Vec<PeakInfo> = samples
            .chunks_exact(window)
            .map(|chunk| self.reducer.reduce(chunk))
            .collect();
        tracing::trace!(%format, window, peaks = peaks.len(), "extracted peaks");
        Ok(peaks)
    }

    /// Reduce interleaved stereo into asymmetric peaks.
    ///
    /// The left channel feeds `max` and the negated right channel feeds `min`,
    /// so one pass yields both halves of a split stereo display.
    ///
    /// # Errors
    /// Returns [`WaveformError::UnsupportedFormat`] unless the format has exactly
    /// two channels, or fails if [`Self::window_size`] does.
    pub fn extract_stereo(&self, format: &AudioFormat, data: &[u8]) -> WaveResult<Vec<PeakInfo>> {
        if format.channels() != 2 {
            return Err(WaveformError::unsupported_format("extract_stereo", format));
        }
        let frames_per_window = self.window_size(format)? / 2;
        let samples = format.decode_samples(data);
        let frames = samples.len() / 2;
        let view = ArrayView2::from_shape((frames, 2), &samples[..frames * 2])
            .map_err(|e| WaveformError::unsupported_format("extract_stereo", e))?;

        let peaks = view
            .axis_chunks_iter(Axis(0), frames_per_window)
            .filter(|window| window.nrows() == frames_per_window)
            .map(|window| {
                let left: Vec<f32> = window.slice(s![.., 0]).iter().copied().collect();
                let right: Vec<f32> = window.slice(s![.., 1]).iter().copied().collect();
                PeakInfo::new(
                    -self.reducer.magnitude(&right),
                    self.reducer.magnitude(&left),
                )
            })
            .collect();
        Ok(peaks)
    }
}

/// Incremental extractor that carries partial windows across chunks.
///
/// Feeding the same bytes in any chunking yields the same peaks as one call to
/// [`PeakExtractor::extract`] over their concatenation.
#[derive(Debug, Clone)]
pub struct PeakAccumulator {
    format: AudioFormat,
    reducer: PeakReducer,
    window_bytes: usize,
    pending: Vec<u8>,
}

impl PeakAccumulator {
    /// Create an accumulator for audio in `format`.
    ///
    /// # Errors
    /// Fails if [`PeakExtractor::window_size`] does for this format.
    pub fn new(extractor: &PeakExtractor, format: AudioFormat) -> WaveResult<Self> {
        let window = extractor.window_size(&format)?;
        Ok(Self {
            format,
            reducer: extractor.reducer().clone(),
            window_bytes: window * format.encoding().bytes_per_sample(),
            pending: Vec::new(),
        })
    }

    /// The format this accumulator decodes.
    pub const fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Bytes of the incomplete window waiting for more data.
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    /// Append `data` and return the peaks of every window it completes.
    pub fn push(&mut self, data: &[u8]) -> Vec<PeakInfo> {
        self.pending.extend_from_slice(data);
        let complete = self.pending.len() / self.window_bytes * self.window_bytes;
        let peaks = self.pending[..complete]
            .chunks_exact(self.window_bytes)
            .map(|window| self.reducer.reduce(&self.format.decode_samples(window)))
            .collect();
        self.pending.drain(..complete);
        peaks
    }

    /// Discard the incomplete window.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Peaks of a live channel, kept aligned with its bounded buffer.
///
/// New samples append peaks; a wraparound shift drops the peaks covering the
/// discarded audio so the peak list mirrors the buffer contents.
#[derive(Debug, Clone)]
pub struct LiveWaveform {
    peaks_per_second: u32,
    accumulator: PeakAccumulator,
    peaks: Vec<PeakInfo>,
}

impl LiveWaveform {
    /// Create a live waveform for audio in `format`.
    ///
    /// # Errors
    /// Fails if [`PeakExtractor::window_size`] does for this format.
    pub fn new(extractor: &PeakExtractor, format: AudioFormat) -> WaveResult<Self> {
        Ok(Self {
            peaks_per_second: extractor.peaks_per_second(),
            accumulator: PeakAccumulator::new(extractor, format)?,
            peaks: Vec::new(),
        })
    }

    /// Subscribe a shared live waveform to `channel`.
    ///
    /// Events the waveform cannot handle are logged and skipped.
    ///
    /// # Errors
    /// Fails if [`PeakExtractor::window_size`] does for the channel format.
    pub fn attach(
        channel: &StreamingChannel,
        extractor: &PeakExtractor,
    ) -> WaveResult<(Arc<Mutex<Self>>, SubscriptionId)> {
        let waveform = Arc::new(Mutex::new(Self::new(extractor, *channel.format())?));
        let sink = Arc::clone(&waveform);
        let id = channel.subscribe(move |event| {
            if let Err(error) = sink.lock().handle(event) {
                tracing::warn!(source = %event.source(), %error, "live waveform skipped event");
            }
        });
        Ok((waveform, id))
    }

    /// Apply one channel event.
    ///
    /// Returns the number of peaks added by `SamplesReceived`; shifts and
    /// wraparound notices return zero.
    ///
    /// # Errors
    /// Returns [`WaveformError::UnsupportedFormat`] if samples arrive in a format
    /// other than the one this waveform was built for.
    pub fn handle(&mut self, event: &StreamEvent) -> WaveResult<usize> {
        match event {
            StreamEvent::SamplesReceived {
                format, payload, ..
            } => {
                if format != self.accumulator.format() {
                    return Err(WaveformError::unsupported_format("live waveform", format));
                }
                let peaks = self.accumulator.push(payload);
                let added = peaks.len();
                self.peaks.extend(peaks);
                Ok(added)
            }
            StreamEvent::AudioShifted { shift, .. } => {
                self.apply_shift(*shift);
                Ok(0)
            }
            StreamEvent::WrappedAround { .. } => Ok(0),
        }
    }

    /// Drop the peaks covering the first `shift` of audio.
    pub fn apply_shift(&mut self, shift: Duration) {
        let dropped = (shift.as_nanos() * self.peaks_per_second as u128 / 1_000_000_000) as usize;
        let dropped = dropped.min(self.peaks.len());
        self.peaks.drain(..dropped);
        tracing::trace!(dropped, remaining = self.peaks.len(), "live waveform shifted");
    }

    /// Current peaks, oldest first.
    pub fn peaks(&self) -> &[PeakInfo] {
        &self.peaks
    }

    /// Audio covered by the current peaks.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.peaks.len() as f64 / self.peaks_per_second as f64)
    }

    /// Snapshot the current peaks as a summary.
    pub fn summary(&self) -> WaveformSummary {
        WaveformSummary::from_peaks(self.peaks_per_second, self.peaks.clone())
    }

    /// Forget all peaks and any incomplete window.
    pub fn clear(&mut self) {
        self.peaks.clear();
        self.accumulator.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encode_float_samples;
    use crate::streaming::{SourceId, StreamingChannelConfig};
    use approx_eq::assert_approx_eq;
    use std::time::SystemTime;

    fn square_wave(samples: usize, half_period: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| if (i / half_period) % 2 == 0 { 1.0 } else { -1.0 })
            .collect()
    }

    fn samples_event(format: AudioFormat, samples: &[f32]) -> StreamEvent {
        StreamEvent::SamplesReceived {
            source: SourceId::from("test"),
            stream_time: Duration::ZERO,
            format,
            payload: encode_float_samples(samples).into(),
            absolute_time: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_square_wave_yields_ten_full_peaks() {
        let format = AudioFormat::ieee_float(8000, 1).unwrap();
        let bytes = encode_float_samples(&square_wave(8000, 20));
        let peaks = PeakExtractor::default().extract(&format, &bytes).unwrap();
        assert_eq!(peaks.len(), 10);
        for peak in peaks {
            assert_eq!(peak, PeakInfo::new(-1.0, 1.0));
        }
    }

    #[test]
    fn test_window_count_drops_partial_window() {
        let extractor = PeakExtractor::new(10, PeakReducer::MaxAbs).unwrap();
        let format = AudioFormat::ieee_float(8000, 2).unwrap();
        assert_eq!(extractor.window_size(&format).unwrap(), 1600);

        for total in [0usize, 1599, 1600, 1601, 4800, 5000] {
            let bytes = encode_float_samples(&vec![0.25; total]);
            let peaks = extractor.extract(&format, &bytes).unwrap();
            assert_eq!(peaks.len(), total / 1600, "total={total}");
        }
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(PeakExtractor::new(0, PeakReducer::Rms).unwrap_err().is_configuration());

        let extractor = PeakExtractor::new(100, PeakReducer::MaxAbs).unwrap();
        let slow = AudioFormat::ieee_float(50, 1).unwrap();
        assert!(matches!(
            extractor.extract(&slow, &[]),
            Err(WaveformError::InvalidConfiguration {
                parameter: "peaks_per_second",
                ..
            })
        ));
    }

    #[test]
    fn test_reducers() {
        let window = [0.5, -1.0, 0.25, 0.25];
        assert_eq!(PeakReducer::MaxAbs.reduce(&window), PeakInfo::symmetric(1.0));
        assert_eq!(PeakReducer::MinMax.reduce(&window), PeakInfo::new(-1.0, 0.5));
        assert_eq!(PeakReducer::Average.reduce(&window), PeakInfo::symmetric(0.5));

        let rms = PeakReducer::Rms.reduce(&window);
        assert_approx_eq!(rms.max as f64, (1.375f64 / 4.0).sqrt(), 1e-6);
        assert_eq!(rms.min, -rms.max);

        let first = PeakReducer::custom(|w| PeakInfo::new(w[0], w[0]));
        assert_eq!(first.reduce(&window), PeakInfo::new(0.5, 0.5));
        assert_eq!(PeakReducer::Rms.reduce(&[]), PeakInfo::default());
        assert_eq!(format!("{first:?}"), "Custom(..)");
    }

    #[test]
    fn test_stereo_extraction_is_asymmetric() {
        let extractor = PeakExtractor::new(2, PeakReducer::MaxAbs).unwrap();
        let format = AudioFormat::ieee_float(4, 2).unwrap();
        // Two frames per window: left is loud, right is quiet.
        let interleaved = [0.9, 0.1, -0.8, -0.2, 0.3, 0.4, 0.2, -0.6, 1.0, 1.0];
        let peaks = extractor
            .extract_stereo(&format, &encode_float_samples(&interleaved))
            .unwrap();

        assert_eq!(peaks, vec![PeakInfo::new(-0.2, 0.9), PeakInfo::new(-0.6, 0.3)]);
    }

    #[test]
    fn test_stereo_extraction_requires_two_channels() {
        let extractor = PeakExtractor::default();
        for channels in [1, 6] {
            let format = AudioFormat::ieee_float(8000, channels).unwrap();
            assert!(matches!(
                extractor.extract_stereo(&format, &[]),
                Err(WaveformError::UnsupportedFormat {
                    operation: "extract_stereo",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_accumulator_matches_one_shot_extraction() {
        let extractor = PeakExtractor::new(20, PeakReducer::MinMax).unwrap();
        let format = AudioFormat::pcm16(8000, 1).unwrap();
        let bytes: Vec<u8> = (0..9000i32)
            .flat_map(|i| (((i * 37) % 20000 - 10000) as i16).to_le_bytes())
            .collect();
        let expected = extractor.extract(&format, &bytes).unwrap();

        let mut accumulator = PeakAccumulator::new(&extractor, format).unwrap();
        let mut peaks = Vec::new();
        // Odd chunk sizes split samples as well as windows.
        for chunk in bytes.chunks(333) {
            peaks.extend(accumulator.push(chunk));
        }
        assert_eq!(peaks, expected);
        assert_eq!(accumulator.pending_bytes(), (9000 % 400) * 2);
    }

    #[test]
    fn test_live_waveform_follows_samples_and_shifts() {
        let format = AudioFormat::ieee_float(1000, 1).unwrap();
        let mut live = LiveWaveform::new(&PeakExtractor::default(), format).unwrap();

        let added = live.handle(&samples_event(format, &vec![0.5; 2050])).unwrap();
        assert_eq!(added, 20);
        assert_eq!(live.duration(), Duration::from_secs(2));

        let shift = StreamEvent::AudioShifted {
            source: SourceId::from("test"),
            shift: Duration::from_millis(1250),
            new_start_time: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(live.handle(&shift).unwrap(), 0);
        assert_eq!(live.peaks().len(), 8);

        // The 50 leftover samples combine with the next chunk.
        assert_eq!(live.handle(&samples_event(format, &vec![1.0; 50])).unwrap(), 1);
        assert_eq!(live.peaks().last(), Some(&PeakInfo::symmetric(1.0)));

        live.apply_shift(Duration::from_secs(60));
        assert!(live.peaks().is_empty());
    }

    #[test]
    fn test_live_waveform_rejects_foreign_format() {
        let format = AudioFormat::ieee_float(1000, 1).unwrap();
        let mut live = LiveWaveform::new(&PeakExtractor::default(), format).unwrap();
        let other = AudioFormat::ieee_float(2000, 1).unwrap();
        assert!(live.handle(&samples_event(other, &[0.0; 400])).is_err());
        assert!(live.peaks().is_empty());
    }

    #[test]
    fn test_live_waveform_attached_to_channel() {
        let format = AudioFormat::ieee_float(1000, 1).unwrap();
        let config = StreamingChannelConfig {
            buffer_duration: Duration::from_secs(2),
            preserve_after_wrap_around: Duration::from_secs(1),
            time_shift: Duration::ZERO,
        };
        let channel = StreamingChannel::new("live://mic", format, config).unwrap();
        let (live, _id) = LiveWaveform::attach(&channel, &PeakExtractor::default()).unwrap();

        for _ in 0..5 {
            channel.append(&encode_float_samples(&[0.5; 500]), None).unwrap();
        }

        // 2.5 s written, one wrap discarded 1 s: the buffer and the peaks both hold 1.5 s.
        let live = live.lock();
        assert_eq!(live.peaks().len(), 15);
        assert_eq!(channel.stream().length_duration(), Duration::from_millis(1500));
    }
}
