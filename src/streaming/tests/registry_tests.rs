//! Tests for the channel registry.

use super::super::channel::{SourceId, StreamingChannelConfig};
use super::super::registry::ChannelRegistry;
use super::{FixedClock, epoch_plus, ramp_bytes};
use crate::{AudioFormat, WaveformError};
use std::sync::Arc;
use std::time::Duration;

fn registry() -> ChannelRegistry {
    ChannelRegistry::with_clock(
        StreamingChannelConfig::live_monitoring(),
        Arc::new(FixedClock(epoch_plus(0))),
    )
    .unwrap()
}

#[test]
fn test_same_source_returns_same_channel() {
    let registry = registry();
    let format = AudioFormat::ieee_float(8000, 1).unwrap();
    let first = registry.get_or_create("tcp://a", format).unwrap();
    let second = registry.get_or_create("tcp://a", format).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other = registry.get_or_create("tcp://b", format).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(
        registry.active_sources(),
        vec![SourceId::from("tcp://a"), SourceId::from("tcp://b")]
    );
}

#[test]
fn test_live_channel_rejects_a_different_format() {
    let registry = registry();
    let format = AudioFormat::ieee_float(8000, 1).unwrap();
    let channel = registry.get_or_create("tcp://a", format).unwrap();

    let err = registry
        .get_or_create("tcp://a", AudioFormat::pcm16(44100, 2).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        WaveformError::UnsupportedFormat { operation: "get_or_create", .. }
    ));
    assert!(err.to_string().contains("tcp://a"));

    let again = registry.get_or_create("tcp://a", format).unwrap();
    assert!(Arc::ptr_eq(&channel, &again));
    assert_eq!(again.format(), &format);
}

#[test]
fn test_per_source_configuration() {
    let registry = registry();
    let custom = StreamingChannelConfig {
        buffer_duration: Duration::from_secs(4),
        preserve_after_wrap_around: Duration::from_secs(1),
        time_shift: Duration::from_millis(20),
    };
    registry.configure("file://loop.wav", custom.clone()).unwrap();

    let channel = registry
        .get_or_create("file://loop.wav", AudioFormat::pcm16(8000, 2).unwrap())
        .unwrap();
    assert_eq!(channel.config(), &custom);
    assert_eq!(channel.stream().buffer_duration(), Duration::from_secs(4));

    let fallback = registry.config_for(&SourceId::from("file://other.wav"));
    assert_eq!(fallback, StreamingChannelConfig::live_monitoring());
}

#[test]
fn test_invalid_configuration_rejected_eagerly() {
    let registry = registry();
    let invalid = StreamingChannelConfig {
        buffer_duration: Duration::from_secs(1),
        preserve_after_wrap_around: Duration::from_secs(1),
        time_shift: Duration::ZERO,
    };
    assert!(registry.configure("tcp://a", invalid.clone()).is_err());
    assert!(ChannelRegistry::new(invalid).is_err());
    assert_eq!(
        registry.config_for(&SourceId::from("tcp://a")),
        StreamingChannelConfig::live_monitoring()
    );
}

#[test]
fn test_unreferenced_channel_is_disposed_and_recreated() {
    let registry = registry();
    let format = AudioFormat::ieee_float(8000, 1).unwrap();
    let channel = registry.get_or_create("tcp://a", format).unwrap();
    let stream = channel.stream();
    channel.append(&ramp_bytes(0, 100), None).unwrap();

    drop(channel);
    assert_eq!(stream.capacity(), 0);
    assert!(registry.get(&SourceId::from("tcp://a")).is_none());
    assert!(registry.active_sources().is_empty());

    let fresh = registry.get_or_create("tcp://a", format).unwrap();
    assert_eq!(fresh.stream().length(), 0);
}

#[test]
fn test_close_disposes_live_channel() {
    let registry = registry();
    let format = AudioFormat::ieee_float(8000, 1).unwrap();
    let channel = registry.get_or_create("tcp://a", format).unwrap();

    assert!(registry.close(&SourceId::from("tcp://a")));
    assert!(channel.is_closed());
    assert!(!registry.close(&SourceId::from("tcp://a")));

    let replacement = registry.get_or_create("tcp://a", format).unwrap();
    assert!(!replacement.is_closed());
    assert!(!Arc::ptr_eq(&channel, &replacement));

    registry.close_all();
    assert!(replacement.is_closed());
}
