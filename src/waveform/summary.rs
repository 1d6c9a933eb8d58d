//! Serializable per-source waveform summaries.

use crate::AudioFormat;
use crate::waveform::peaks::PeakInfo;
use crate::waveform::simplify::Point;
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Payload of a [`WaveformSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SummaryData {
    /// Reduced peaks at a fixed rate.
    Peaks {
        /// Peaks per second of audio.
        peaks_per_second: u32,
        /// Peaks in chronological order.
        peaks: Vec<PeakInfo>,
    },
    /// Full-resolution planar samples, one vector per channel.
    Channels(Vec<Vec<f32>>),
}

/// Visual summary of one source: its duration plus peaks or planar samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSummary {
    /// Audio covered by the summary.
    pub duration: Duration,
    /// Peaks or per-channel samples.
    pub data: SummaryData,
}

impl WaveformSummary {
    /// Summary of peaks produced at `peaks_per_second`.
    pub fn from_peaks(peaks_per_second: u32, peaks: Vec<PeakInfo>) -> Self {
        let duration = if peaks_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(peaks.len() as f64 / peaks_per_second as f64)
        };
        Self {
            duration,
            data: SummaryData::Peaks {
                peaks_per_second,
                peaks,
            },
        }
    }

    /// Planar summary of fully decoded interleaved audio.
    ///
    /// A trailing partial frame is ignored.
    pub fn from_decoded(format: &AudioFormat, data: &[u8]) -> Self {
        let samples = format.decode_samples(data);
        let channels = format.channels() as usize;
        let frames = samples.len() / channels;

        let planar = match ArrayView2::from_shape((frames, channels), &samples[..frames * channels]) {
            Ok(view) => view
                .axis_iter(Axis(1))
                .map(|channel| channel.iter().copied().collect())
                .collect(),
            Err(_) => vec![Vec::new(); channels],
        };

        Self {
            duration: format.bytes_to_duration(frames * format.block_align()),
            data: SummaryData::Channels(planar),
        }
    }

    /// Number of entries along the time axis.
    pub fn len(&self) -> usize {
        match &self.data {
            SummaryData::Peaks { peaks, .. } => peaks.len(),
            SummaryData::Channels(channels) => channels.first().map_or(0, Vec::len),
        }
    }

    /// Whether the summary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper outline: peak maxima, or the largest channel sample per frame.
    ///
    /// `x` is in seconds from the start of the summary.
    pub fn upper_envelope(&self) -> Vec<Point> {
        self.envelope(|peak| peak.max, f32::max)
    }

    /// Lower outline: peak minima, or the smallest channel sample per frame.
    pub fn lower_envelope(&self) -> Vec<Point> {
        self.envelope(|peak| peak.min, f32::min)
    }

    fn envelope(&self, bound: impl Fn(&PeakInfo) -> f32, combine: impl Fn(f32, f32) -> f32) -> Vec<Point> {
        let len = self.len();
        if len == 0 {
            return Vec::new();
        }
        let step = self.duration.as_secs_f64() / len as f64;

        match &self.data {
            SummaryData::Peaks { peaks, .. } => peaks
                .iter()
                .enumerate()
                .map(|(i, peak)| Point::new(i as f64 * step, bound(peak) as f64))
                .collect(),
            SummaryData::Channels(channels) => (0..len)
                .map(|i| {
                    let value = channels
                        .iter()
                        .filter_map(|channel| channel.get(i).copied())
                        .reduce(&combine)
                        .unwrap_or(0.0);
                    Point::new(i as f64 * step, value as f64)
                })
                .collect(),
        }
    }
}
