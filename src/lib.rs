// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)] // Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::vec_box)] // Avoids using `Vec<Box<T>>` when unnecessary
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![deny(missing_docs)] // Documentation is a must for release

//! # waveform_stream
//!
//! Bounded, ring-buffered audio streams with live waveform extraction.
//!
//! Decoded audio from files or live sources is appended to a
//! [`StreamingChannel`](streaming::StreamingChannel), which keeps a fixed window
//! of recent audio in a [`BoundedAudioStream`](streaming::BoundedAudioStream)
//! and maps stream positions to wall-clock time. When the window fills up, the
//! oldest audio is discarded except for a configurable preserved tail, and
//! subscribers are told how far the content moved.
//!
//! The same samples can be reduced into compact visual summaries:
//!
//! - [`resampling`] converts heterogeneous formats into one mono float stream for mixing.
//! - [`waveform`] reduces samples into per-window peaks and simplifies the
//!   resulting envelopes with Douglas–Peucker.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! waveform_stream = "0.1.0"
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`WaveResult`]:
//!
//! ```rust
//! use waveform_stream::{AudioFormat, WaveformError};
//! use waveform_stream::streaming::BoundedAudioStream;
//! use std::time::Duration;
//!
//! let stream = BoundedAudioStream::new(AudioFormat::ieee_float(8000, 1).unwrap(), Duration::from_secs(2)).unwrap();
//!
//! match stream.set_preserve_after_wrap_around(Duration::from_secs(5)) {
//!     Ok(()) => {}
//!     Err(WaveformError::InvalidConfiguration { parameter, reason }) => {
//!         eprintln!("{parameter}: {reason}")
//!     }
//!     Err(other) => eprintln!("Other error: {other}"),
//! }
//! ```
//!
//! ## Quick Start
//!
//! ### Live channel with a waveform
//!
//! ```rust
//! use waveform_stream::AudioFormat;
//! use waveform_stream::format::encode_float_samples;
//! use waveform_stream::streaming::{StreamingChannel, StreamingChannelConfig};
//! use waveform_stream::waveform::{LiveWaveform, PeakExtractor, simplify};
//!
//! let format = AudioFormat::ieee_float(8000, 1).unwrap();
//! let channel = StreamingChannel::new("udp://mic", format, StreamingChannelConfig::live_monitoring()).unwrap();
//! let (waveform, _subscription) = LiveWaveform::attach(&channel, &PeakExtractor::default()).unwrap();
//!
//! channel.append(&encode_float_samples(&[0.5; 8000]), None).unwrap();
//!
//! let summary = waveform.lock().summary();
//! assert_eq!(summary.len(), 10);
//! let outline = simplify(&summary.upper_envelope(), 0.01);
//! assert_eq!(outline.len(), 2);
//! ```
//!
//! ### Mixing sources
//!
//! ```rust
//! use waveform_stream::{AudioFormat, Resampler};
//! use waveform_stream::format::encode_float_samples;
//!
//! let resampler = Resampler::new(8000).unwrap();
//! let a = encode_float_samples(&[1.0; 4]);
//! let b = encode_float_samples(&[0.0; 8]);
//! let mixed = resampler.mix(&[
//!     (AudioFormat::ieee_float(8000, 1).unwrap(), a.as_slice()),
//!     (AudioFormat::ieee_float(16000, 1).unwrap(), b.as_slice()),
//! ]);
//! assert_eq!(mixed, vec![0.5; 4]);
//! ```

mod error;
pub mod format;
pub mod resampling;
pub mod streaming;
pub mod waveform;

pub use crate::error::{WaveResult, WaveformError};
pub use crate::format::{AudioFormat, SampleEncoding};
pub use crate::resampling::{Resampler, downmix, resample, resample_mono};
pub use crate::waveform::{
    LiveWaveform, PeakAccumulator, PeakExtractor, PeakInfo, PeakReducer, Point, SummaryData,
    WaveformSummary, simplify, simplify_indices,
};
