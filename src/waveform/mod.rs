//! Compact visual summaries of audio: per-window peaks and simplified envelopes.
//!
//! Raw samples are reduced into [`PeakInfo`] windows at a fixed number of peaks
//! per second, either in one pass ([`PeakExtractor`]) or incrementally from a
//! live channel ([`LiveWaveform`]). The resulting envelopes can be reduced
//! further for rendering with [`simplify`].
//!
//! ```rust
//! use waveform_stream::AudioFormat;
//! use waveform_stream::format::encode_float_samples;
//! use waveform_stream::waveform::{PeakExtractor, PeakInfo, WaveformSummary, simplify};
//!
//! let format = AudioFormat::ieee_float(8000, 1).unwrap();
//! let square: Vec<f32> = (0..8000).map(|i| if (i / 40) % 2 == 0 { 1.0 } else { -1.0 }).collect();
//! let bytes = encode_float_samples(&square);
//!
//! let peaks = PeakExtractor::default().extract(&format, &bytes).unwrap();
//! assert_eq!(peaks.len(), 10);
//! assert!(peaks.iter().all(|p| *p == PeakInfo::new(-1.0, 1.0)));
//!
//! let summary = WaveformSummary::from_peaks(10, peaks);
//! let outline = simplify(&summary.upper_envelope(), 0.01);
//! assert_eq!(outline.len(), 2);
//! ```

pub mod peaks;
pub mod simplify;
pub mod summary;

pub use peaks::{LiveWaveform, PeakAccumulator, PeakExtractor, PeakInfo, PeakReducer};
pub use simplify::{Point, simplify, simplify_indices};
pub use summary::{SummaryData, WaveformSummary};
