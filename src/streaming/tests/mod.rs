//! Tests for the streaming core.
//!
//! Covers the ring buffer primitives, the wraparound policy of bounded
//! streams, channel time mapping and notifications, and the channel registry.

use super::channel::Clock;
use crate::format::encode_float_samples;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod buffer_tests;
mod registry_tests;

/// Float bytes whose sample `i` equals `i as f32`, easy to locate after a shift.
pub(crate) fn ramp_bytes(start: usize, samples: usize) -> Vec<u8> {
    let values: Vec<f32> = (start..start + samples).map(|i| i as f32).collect();
    encode_float_samples(&values)
}

/// Decode little-endian float bytes back into samples.
pub(crate) fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Clock pinned to a fixed instant.
pub(crate) struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

pub(crate) fn epoch_plus(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}
