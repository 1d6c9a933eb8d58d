//! Live source binding: a bounded stream plus its absolute-time mapping.

use super::bounded::BoundedAudioStream;
use super::events::{EventBus, StreamEvent, SubscriptionId};
use crate::{AudioFormat, WaveResult, WaveformError};
use crossbeam::channel::Receiver;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

/// URI-like identity of a live or file source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Arc<str>);

impl SourceId {
    /// Create an identity from any string-like key.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SourceId {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

/// Per-source buffering configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingChannelConfig {
    /// Total audio held by the channel's ring buffer.
    pub buffer_duration: Duration,

    /// Newest audio kept across a wraparound. Must be shorter than `buffer_duration`.
    pub preserve_after_wrap_around: Duration,

    /// Offset added to every resolved absolute time, e.g. to compensate source latency.
    pub time_shift: Duration,
}

impl Default for StreamingChannelConfig {
    fn default() -> Self {
        Self {
            buffer_duration: Duration::from_secs(30),
            preserve_after_wrap_around: Duration::from_secs(10),
            time_shift: Duration::ZERO,
        }
    }
}

impl StreamingChannelConfig {
    /// Short buffer for monitoring a live source with minimal memory.
    pub const fn live_monitoring() -> Self {
        Self {
            buffer_duration: Duration::from_secs(10),
            preserve_after_wrap_around: Duration::from_secs(2),
            time_shift: Duration::ZERO,
        }
    }

    /// Long buffer for looping file playback.
    pub const fn file_playback() -> Self {
        Self {
            buffer_duration: Duration::from_secs(300),
            preserve_after_wrap_around: Duration::from_secs(60),
            time_shift: Duration::ZERO,
        }
    }

    /// Check the buffer and preservation durations.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] for an empty buffer or a
    /// preservation window that is not shorter than the buffer.
    pub fn validate(&self) -> WaveResult<()> {
        if self.buffer_duration.is_zero() {
            return Err(WaveformError::invalid_configuration(
                "buffer_duration",
                "must be greater than zero",
            ));
        }
        if self.preserve_after_wrap_around >= self.buffer_duration {
            return Err(WaveformError::invalid_configuration(
                "preserve_after_wrap_around",
                format!(
                    "{:?} must be shorter than the buffer duration {:?}",
                    self.preserve_after_wrap_around, self.buffer_duration
                ),
            ));
        }
        Ok(())
    }
}

/// Source of local wall-clock time for channels without an authoritative timestamp.
pub trait Clock: Send + Sync {
    /// Current absolute time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Binds one live source to a [`BoundedAudioStream`] and keeps the mapping
/// from stream position zero to absolute time valid across wraparounds.
///
/// Appends are serialised per channel, so subscribers observe events in the
/// order the appends were made. Subscribers must not append to the channel
/// that is notifying them.
pub struct StreamingChannel {
    source: SourceId,
    config: StreamingChannelConfig,
    stream: Arc<BoundedAudioStream>,
    start_time: RwLock<Option<SystemTime>>,
    append_lock: Mutex<()>,
    closed: AtomicBool,
    events: EventBus<StreamEvent>,
    clock: Arc<dyn Clock>,
}

impl StreamingChannel {
    /// Create a channel using the system clock.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if `config` is invalid.
    pub fn new(
        source: impl Into<SourceId>,
        format: AudioFormat,
        config: StreamingChannelConfig,
    ) -> WaveResult<Self> {
        Self::with_clock(source, format, config, Arc::new(SystemClock))
    }

    /// Create a channel reading local time from `clock`.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if `config` is invalid.
    pub fn with_clock(
        source: impl Into<SourceId>,
        format: AudioFormat,
        config: StreamingChannelConfig,
        clock: Arc<dyn Clock>,
    ) -> WaveResult<Self> {
        config.validate()?;
        let source = source.into();
        let stream = BoundedAudioStream::new(format, config.buffer_duration)?;
        stream.set_preserve_after_wrap_around(config.preserve_after_wrap_around)?;

        tracing::debug!(%source, %format, ?config, "opened streaming channel");
        Ok(Self {
            source,
            config,
            stream: Arc::new(stream),
            start_time: RwLock::new(None),
            append_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            events: EventBus::new(),
            clock,
        })
    }

    /// Identity of the bound source.
    pub const fn source(&self) -> &SourceId {
        &self.source
    }

    /// Format of the appended audio.
    pub fn format(&self) -> &AudioFormat {
        self.stream.format()
    }

    /// Configuration the channel was created with.
    pub const fn config(&self) -> &StreamingChannelConfig {
        &self.config
    }

    /// Shared handle to the underlying stream, for playback readers.
    pub fn stream(&self) -> Arc<BoundedAudioStream> {
        Arc::clone(&self.stream)
    }

    /// Absolute time mapped to stream position zero, once known.
    pub fn start_time(&self) -> Option<SystemTime> {
        *self.start_time.read()
    }

    /// Absolute time of stream position `position`.
    pub fn time_at(&self, position: Duration) -> Option<SystemTime> {
        self.start_time().map(|start| start + position)
    }

    /// Stream position of absolute time `time`, if it is not before position zero.
    pub fn position_at(&self, time: SystemTime) -> Option<Duration> {
        self.start_time()
            .and_then(|start| time.duration_since(start).ok())
    }

    /// Check if the channel has been disposed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Append decoded bytes, optionally stamped with an authoritative source time.
    ///
    /// A timestamp recalibrates the start time so that the new bytes map to it
    /// exactly. [`StreamEvent::SamplesReceived`] is published before the bytes
    /// are written; every wraparound caused by the write advances the start
    /// time and publishes [`StreamEvent::WrappedAround`] followed by
    /// [`StreamEvent::AudioShifted`].
    ///
    /// # Errors
    /// Returns [`WaveformError::ChannelClosed`] after [`StreamingChannel::dispose`].
    pub fn append(&self, data: &[u8], sample_timestamp: Option<SystemTime>) -> WaveResult<()> {
        let _producer = self.append_lock.lock();
        if self.is_closed() {
            return Err(WaveformError::ChannelClosed(self.source.to_string()));
        }

        let stream_time = self.stream.current_write_time();
        let start = self.resolve_start_time(stream_time, sample_timestamp);
        let absolute_time = start + stream_time + self.config.time_shift;

        tracing::trace!(source = %self.source, bytes = data.len(), ?stream_time, "appending samples");
        self.events.publish(StreamEvent::SamplesReceived {
            source: self.source.clone(),
            stream_time,
            format: *self.stream.format(),
            payload: Arc::from(data),
            absolute_time,
        });

        for wrap in self.stream.add_samples(data) {
            let new_start_time = {
                let mut current = self.start_time.write();
                let shifted = current.unwrap_or(start) + wrap.skipped;
                *current = Some(shifted);
                shifted
            };

            self.events.publish(StreamEvent::WrappedAround {
                source: self.source.clone(),
                skipped: wrap.skipped,
            });
            self.events.publish(StreamEvent::AudioShifted {
                source: self.source.clone(),
                shift: wrap.skipped,
                new_start_time: new_start_time + self.config.time_shift,
            });
        }

        Ok(())
    }

    fn resolve_start_time(
        &self,
        stream_time: Duration,
        sample_timestamp: Option<SystemTime>,
    ) -> SystemTime {
        let mut current = self.start_time.write();
        let resolved = match (sample_timestamp, *current) {
            (Some(timestamp), previous) => {
                let calibrated = timestamp.checked_sub(stream_time).unwrap_or(timestamp);
                if let Some(previous) = previous {
                    if previous != calibrated {
                        tracing::trace!(
                            source = %self.source,
                            drift = ?drift(previous, calibrated),
                            "recalibrated start time"
                        );
                    }
                }
                calibrated
            }
            (None, Some(previous)) => previous,
            (None, None) => {
                let now = self.clock.now();
                now.checked_sub(stream_time).unwrap_or(now)
            }
        };
        *current = Some(resolved);
        resolved
    }

    /// Register a callback for every event of this channel.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Receive this channel's events through an unbounded queue.
    pub fn subscribe_queue(&self) -> Receiver<StreamEvent> {
        self.events.subscribe_queue()
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Stop accepting samples, drop all subscribers and free the ring buffer.
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn dispose(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.events.clear();
        self.stream.release();
        tracing::debug!(source = %self.source, "disposed streaming channel");
    }
}

fn drift(previous: SystemTime, calibrated: SystemTime) -> Duration {
    previous
        .duration_since(calibrated)
        .or_else(|_| calibrated.duration_since(previous))
        .unwrap_or_default()
}

impl Drop for StreamingChannel {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for StreamingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingChannel")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("start_time", &self.start_time())
            .field("closed", &self.is_closed())
            .finish()
    }
}
