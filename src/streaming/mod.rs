//! Bounded, ring-buffered audio streaming for live and file sources.
//!
//! This module provides the buffering core:
//! - [`RingBuffer`]: fixed-capacity byte store with read/write cursors and a shift primitive
//! - [`BoundedAudioStream`]: positioned audio stream that preserves its newest audio across wraparounds
//! - [`StreamingChannel`]: binds a source to a stream and keeps stream time mapped to absolute time
//! - [`ChannelRegistry`]: typed per-source configuration and channel lifecycle
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use waveform_stream::AudioFormat;
//! use waveform_stream::streaming::{StreamEvent, StreamingChannel, StreamingChannelConfig};
//!
//! let format = AudioFormat::ieee_float(8000, 1).unwrap();
//! let config = StreamingChannelConfig {
//!     buffer_duration: Duration::from_secs(2),
//!     preserve_after_wrap_around: Duration::from_secs(1),
//!     time_shift: Duration::ZERO,
//! };
//! let channel = StreamingChannel::new("udp://mic", format, config).unwrap();
//! let events = channel.subscribe_queue();
//!
//! channel.append(&vec![0u8; 32000], None).unwrap();
//! assert!(matches!(events.try_recv(), Ok(StreamEvent::SamplesReceived { .. })));
//! ```

pub mod bounded;
pub mod channel;
pub mod events;
pub mod registry;
pub mod ring_buffer;

#[cfg(test)]
mod tests;

pub use bounded::BoundedAudioStream;
pub use channel::{Clock, SourceId, StreamingChannel, StreamingChannelConfig, SystemClock};
pub use events::{EventBus, StreamEvent, SubscriptionId, WrappedAround};
pub use registry::ChannelRegistry;
pub use ring_buffer::RingBuffer;
