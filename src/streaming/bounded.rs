//! Ring-buffered audio stream with a wraparound preservation policy.

use super::events::{EventBus, SubscriptionId, WrappedAround};
use super::ring_buffer::RingBuffer;
use crate::{AudioFormat, WaveResult, WaveformError};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A positioned audio stream backed by a fixed-size [`RingBuffer`].
///
/// Writes append after the current content. When a write would run past the
/// end of the buffer, everything except the newest
/// `preserve_after_wrap_around` of audio is discarded, the preserved tail is
/// slid to the front and the write continues behind it. Readers keep a valid
/// position across the shift because their cursor moves with the content.
///
/// The stream is shared between the producing channel and a playback reader;
/// all methods take `&self`.
pub struct BoundedAudioStream {
    format: AudioFormat,
    buffer_duration: Duration,
    ring: RingBuffer,
    preserve_bytes: Mutex<usize>,
    write_lock: Mutex<()>,
    wrap_listeners: EventBus<WrappedAround>,
    wraparounds: AtomicU64,
}

impl BoundedAudioStream {
    /// Create a stream holding `buffer_duration` of `format` audio.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if the duration does not
    /// hold at least one frame.
    pub fn new(format: AudioFormat, buffer_duration: Duration) -> WaveResult<Self> {
        let capacity = format.duration_to_bytes(buffer_duration);
        if capacity == 0 {
            return Err(WaveformError::invalid_configuration(
                "buffer_duration",
                format!("{buffer_duration:?} holds no whole frame of {format}"),
            ));
        }

        tracing::debug!(%format, ?buffer_duration, capacity, "creating bounded audio stream");
        Ok(Self {
            format,
            buffer_duration,
            ring: RingBuffer::new(capacity),
            preserve_bytes: Mutex::new(0),
            write_lock: Mutex::new(()),
            wrap_listeners: EventBus::new(),
            wraparounds: AtomicU64::new(0),
        })
    }

    /// Format of the stored audio.
    pub const fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Total duration the buffer can hold.
    pub const fn buffer_duration(&self) -> Duration {
        self.buffer_duration
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Audio kept across a wraparound.
    pub fn preserve_after_wrap_around(&self) -> Duration {
        self.format.bytes_to_duration(*self.preserve_bytes.lock())
    }

    /// Set how much of the newest audio survives a wraparound.
    ///
    /// # Errors
    /// Returns [`WaveformError::InvalidConfiguration`] if `preserve` is not
    /// strictly shorter than the buffer duration. The previous value is kept.
    pub fn set_preserve_after_wrap_around(&self, preserve: Duration) -> WaveResult<()> {
        if preserve >= self.buffer_duration {
            return Err(WaveformError::invalid_configuration(
                "preserve_after_wrap_around",
                format!(
                    "{preserve:?} must be shorter than the buffer duration {:?}",
                    self.buffer_duration
                ),
            ));
        }
        *self.preserve_bytes.lock() = self.format.duration_to_bytes(preserve);
        Ok(())
    }

    /// Append interleaved bytes, wrapping around as often as needed.
    ///
    /// Returns one [`WrappedAround`] per shift, in order. The same events are
    /// delivered to wraparound listeners after the write completes.
    pub fn add_samples(&self, data: &[u8]) -> Vec<WrappedAround> {
        let mut wraps = Vec::new();
        {
            let _writer = self.write_lock.lock();
            let capacity = self.ring.capacity();
            if capacity == 0 {
                return wraps;
            }

            let preserved =
                (*self.preserve_bytes.lock()).min(capacity - self.format.block_align());
            let skipped_bytes = capacity - preserved;
            let mut remaining = data;

            while !remaining.is_empty() {
                let space = capacity - self.ring.len();
                if remaining.len() <= space {
                    self.ring.write(remaining);
                    break;
                }

                let (fits, overflow) = remaining.split_at(space);
                self.ring.write(fits);
                self.ring.shift(skipped_bytes as isize);
                remaining = overflow;

                let wrap = WrappedAround {
                    skipped: self.format.bytes_to_duration(skipped_bytes),
                };
                self.wraparounds.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(skipped = ?wrap.skipped, preserved, "bounded audio stream wrapped around");
                wraps.push(wrap);
            }
        }

        for wrap in &wraps {
            self.wrap_listeners.publish(*wrap);
        }
        wraps
    }

    /// Register a callback invoked after every wraparound shift.
    pub fn on_wrapped_around<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&WrappedAround) + Send + Sync + 'static,
    {
        self.wrap_listeners.subscribe(callback)
    }

    /// Remove a wraparound callback.
    pub fn remove_wrap_listener(&self, id: SubscriptionId) -> bool {
        self.wrap_listeners.unsubscribe(id)
    }

    /// Number of wraparounds since creation.
    pub fn wraparound_count(&self) -> u64 {
        self.wraparounds.load(Ordering::Relaxed)
    }

    /// Read from the current position, zero-filling past the written content.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        self.ring.read(buf)
    }

    /// Bytes of audio currently stored.
    pub fn length(&self) -> usize {
        self.ring.len()
    }

    /// Duration of audio currently stored.
    pub fn length_duration(&self) -> Duration {
        self.format.bytes_to_duration(self.length())
    }

    /// Read position in bytes, within `[0, length]`.
    pub fn position_bytes(&self) -> usize {
        self.ring.read_position()
    }

    /// Move the read position, clamped to `[0, length]` and aligned to a frame.
    pub fn set_position_bytes(&self, position: usize) -> usize {
        let aligned = position - position % self.format.block_align();
        self.ring.set_read_position(aligned)
    }

    /// Read position as stream time.
    pub fn position(&self) -> Duration {
        self.format.bytes_to_duration(self.position_bytes())
    }

    /// Move the read position to stream time `position`.
    pub fn set_position(&self, position: Duration) -> Duration {
        let applied = self.set_position_bytes(self.format.duration_to_bytes(position));
        self.format.bytes_to_duration(applied)
    }

    /// Stream time at which the next appended byte will land.
    pub fn current_write_time(&self) -> Duration {
        self.format.bytes_to_duration(self.ring.len())
    }

    /// Copy of the stored audio in chronological order.
    pub fn snapshot(&self) -> Vec<u8> {
        self.ring.snapshot()
    }

    /// Discard all content and rewind both cursors.
    pub fn clear(&self) {
        let _writer = self.write_lock.lock();
        self.ring.clear();
    }

    /// Free the ring storage and drop all listeners.
    pub fn release(&self) {
        let _writer = self.write_lock.lock();
        self.ring.release();
        self.wrap_listeners.clear();
    }
}

impl std::fmt::Debug for BoundedAudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedAudioStream")
            .field("format", &self.format)
            .field("buffer_duration", &self.buffer_duration)
            .field("ring", &self.ring)
            .finish()
    }
}

impl io::Read for &BoundedAudioStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.length().saturating_sub(self.position_bytes());
        let count = buf.len().min(available);
        Ok(BoundedAudioStream::read(self, &mut buf[..count]))
    }
}

impl io::Write for &BoundedAudioStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.add_samples(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for &BoundedAudioStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => offset as i128,
            io::SeekFrom::Current(delta) => self.position_bytes() as i128 + delta as i128,
            io::SeekFrom::End(delta) => self.length() as i128 + delta as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the stream",
            ));
        }
        let target = usize::try_from(target).unwrap_or(usize::MAX);
        Ok(self.set_position_bytes(target) as u64)
    }
}
