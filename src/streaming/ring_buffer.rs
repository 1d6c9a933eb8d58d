//! Fixed-capacity circular byte store.

use parking_lot::Mutex;

/// A fixed-size circular byte buffer with independent read and write cursors.
///
/// The buffer holds at most `capacity` bytes of content, ordered from the
/// oldest byte to the write cursor. Writing past capacity overwrites the oldest
/// bytes without complaint; owners that must not lose data call
/// [`RingBuffer::shift`] before the write instead.
///
/// Every operation takes the internal lock for the duration of the copy only.
pub struct RingBuffer {
    state: Mutex<RingState>,
}

struct RingState {
    storage: Vec<u8>,
    write_pos: usize,
    read_pos: usize,
    /// Content bytes, ending at `write_pos`.
    len: usize,
    /// Bytes between the read cursor and the write cursor.
    unread: usize,
}

impl RingBuffer {
    /// Create a zeroed buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RingState {
                storage: vec![0; capacity],
                write_pos: 0,
                read_pos: 0,
                len: 0,
                unread: 0,
            }),
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.state.lock().storage.len()
    }

    /// Number of content bytes currently stored.
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    /// Check if the buffer holds no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes between the read cursor and the write cursor.
    pub fn unread(&self) -> usize {
        self.state.lock().unread
    }

    /// Copy `data` in at the write cursor, wrapping at the end of storage.
    ///
    /// At most `capacity` bytes are taken from the front of `data`. Returns the
    /// number of bytes written.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut state = self.state.lock();
        let capacity = state.storage.len();
        let count = data.len().min(capacity);
        if count == 0 {
            return 0;
        }

        let start = state.write_pos;
        let first = count.min(capacity - start);
        state.storage[start..start + first].copy_from_slice(&data[..first]);
        state.storage[..count - first].copy_from_slice(&data[first..count]);

        state.write_pos = (start + count) % capacity;
        state.len = (state.len + count).min(capacity);
        if state.unread + count > capacity {
            // Unread bytes were overwritten: the reader resumes at the oldest byte.
            state.unread = capacity;
            state.read_pos = state.head();
        } else {
            state.unread += count;
        }
        count
    }

    /// Copy bytes from the read cursor into `buf`.
    ///
    /// Bytes beyond what is available are zero-filled, so the whole of `buf` is
    /// always produced and `buf.len()` is returned.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let capacity = state.storage.len();
        let available = buf.len().min(state.unread);

        if available > 0 {
            let start = state.read_pos;
            let first = available.min(capacity - start);
            buf[..first].copy_from_slice(&state.storage[start..start + first]);
            buf[first..available].copy_from_slice(&state.storage[..available - first]);
            state.read_pos = (start + available) % capacity;
            state.unread -= available;
        }

        buf[available..].fill(0);
        buf.len()
    }

    /// Linear offset of the read cursor from the oldest content byte.
    pub fn read_position(&self) -> usize {
        let state = self.state.lock();
        state.len - state.unread.min(state.len)
    }

    /// Move the read cursor to `position` bytes after the oldest content byte.
    ///
    /// The position is clamped to `[0, len]`. Returns the applied position.
    pub fn set_read_position(&self, position: usize) -> usize {
        let mut state = self.state.lock();
        let position = position.min(state.len);
        let capacity = state.storage.len();
        if capacity > 0 {
            state.read_pos = (state.head() + position) % capacity;
        }
        state.unread = state.len - position;
        position
    }

    /// Relocate the whole content by `delta` bytes.
    ///
    /// A positive delta drops the oldest `delta` bytes and moves the remainder
    /// to the front; a negative delta inserts `-delta` bytes of silence at the
    /// front, pushing the newest bytes out if storage overflows. Both cursors
    /// move with the content and the vacated region is zeroed.
    pub fn shift(&self, delta: isize) {
        let mut state = self.state.lock();
        let capacity = state.storage.len();
        if delta == 0 || capacity == 0 {
            return;
        }

        // Linearise so the oldest byte sits at index zero.
        let head = state.head();
        state.storage.rotate_left(head);
        let read_offset = state.len - state.unread.min(state.len);
        let amount = delta.unsigned_abs().min(capacity);

        let (len, read_offset) = if delta > 0 {
            state.storage.copy_within(amount.., 0);
            state.storage[capacity - amount..].fill(0);
            (
                state.len.saturating_sub(amount),
                read_offset.saturating_sub(amount),
            )
        } else {
            state.storage.copy_within(..capacity - amount, amount);
            state.storage[..amount].fill(0);
            let len = (state.len + amount).min(capacity);
            (len, (read_offset + amount).min(len))
        };

        state.len = len;
        state.unread = len - read_offset;
        state.write_pos = len % capacity;
        state.read_pos = read_offset % capacity;
    }

    /// Reset both cursors and zero the storage.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.storage.fill(0);
        state.write_pos = 0;
        state.read_pos = 0;
        state.len = 0;
        state.unread = 0;
    }

    /// Copy of the content in chronological order, cursors untouched.
    pub fn snapshot(&self) -> Vec<u8> {
        let state = self.state.lock();
        let head = state.head();
        let capacity = state.storage.len();
        let first = state.len.min(capacity - head);
        let mut out = Vec::with_capacity(state.len);
        out.extend_from_slice(&state.storage[head..head + first]);
        out.extend_from_slice(&state.storage[..state.len - first]);
        out
    }

    /// Free the storage. The buffer behaves as zero-capacity afterwards.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.storage = Vec::new();
        state.write_pos = 0;
        state.read_pos = 0;
        state.len = 0;
        state.unread = 0;
    }
}

impl RingState {
    fn head(&self) -> usize {
        let capacity = self.storage.len();
        if capacity == 0 {
            0
        } else {
            (self.write_pos + capacity - self.len) % capacity
        }
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &state.storage.len())
            .field("len", &state.len)
            .field("unread", &state.unread)
            .finish()
    }
}
