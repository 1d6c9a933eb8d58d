//! Tests for the ring buffer.

use super::super::ring_buffer::RingBuffer;

fn pattern(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        })
        .collect()
}

#[test]
fn test_ring_buffer_round_trip() {
    for (capacity, len) in [(16, 16), (16, 1), (64, 37), (1000, 999)] {
        let buffer = RingBuffer::new(capacity);
        let data = pattern(len, len as u32);
        assert_eq!(buffer.write(&data), len);

        let mut out = vec![0xAA; len];
        assert_eq!(buffer.read(&mut out), len);
        assert_eq!(out, data);
        assert_eq!(buffer.unread(), 0);
    }
}

#[test]
fn test_round_trip_across_the_storage_end() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[1, 2, 3, 4, 5, 6]);
    let mut out = [0u8; 6];
    buffer.read(&mut out);

    // Write cursor is at 6, so this write wraps to the front.
    let data = [10, 11, 12, 13, 14];
    assert_eq!(buffer.write(&data), 5);
    let mut out = [0u8; 5];
    buffer.read(&mut out);
    assert_eq!(out, data);
}

#[test]
fn test_read_zero_fills_missing_bytes() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[9, 8, 7]);

    let mut out = [0xFFu8; 6];
    assert_eq!(buffer.read(&mut out), 6);
    assert_eq!(out, [9, 8, 7, 0, 0, 0]);
}

#[test]
fn test_write_is_capped_at_capacity() {
    let buffer = RingBuffer::new(4);
    assert_eq!(buffer.write(&[1, 2, 3, 4, 5, 6]), 4);
    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.snapshot(), vec![1, 2, 3, 4]);
}

#[test]
fn test_overwrite_replaces_oldest_bytes() {
    let buffer = RingBuffer::new(4);
    buffer.write(&[1, 2, 3]);
    buffer.write(&[4, 5, 6]);

    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.snapshot(), vec![3, 4, 5, 6]);
}

#[test]
fn test_overwrite_past_read_cursor_restarts_at_oldest_byte() {
    let buffer = RingBuffer::new(4);
    buffer.write(&[1, 2]);
    let mut out = [0u8; 1];
    buffer.read(&mut out);

    buffer.write(&[3, 4, 5, 6]);
    assert_eq!(buffer.read_position(), 0);
    assert_eq!(buffer.unread(), 4);

    let mut out = [0u8; 4];
    buffer.read(&mut out);
    assert_eq!(out.to_vec(), buffer.snapshot());
    assert_eq!(out, [3, 4, 5, 6]);
}

#[test]
fn test_positive_shift_drops_oldest_and_moves_cursors() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[1, 2, 3, 4, 5, 6]);
    buffer.set_read_position(4);

    buffer.shift(3);

    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.snapshot(), vec![4, 5, 6]);
    assert_eq!(buffer.read_position(), 1);

    let mut out = [0u8; 2];
    buffer.read(&mut out);
    assert_eq!(out, [5, 6]);

    buffer.write(&[7]);
    assert_eq!(buffer.snapshot(), vec![4, 5, 6, 7]);
}

#[test]
fn test_shift_clamps_read_cursor_to_content_start() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[1, 2, 3, 4, 5, 6]);
    buffer.set_read_position(1);

    buffer.shift(4);
    assert_eq!(buffer.read_position(), 0);
    assert_eq!(buffer.unread(), 2);
}

#[test]
fn test_negative_shift_inserts_silence() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[1, 2, 3]);

    buffer.shift(-2);

    assert_eq!(buffer.snapshot(), vec![0, 0, 1, 2, 3]);
    assert_eq!(buffer.read_position(), 2);
}

#[test]
fn test_shift_then_unshift_restores_content_except_edge() {
    let buffer = RingBuffer::new(16);
    let data = pattern(16, 7);
    buffer.write(&data);

    buffer.shift(5);
    buffer.shift(-5);

    let restored = buffer.snapshot();
    assert_eq!(restored.len(), 16);
    assert_eq!(&restored[..5], &[0u8; 5]);
    assert_eq!(&restored[5..], &data[5..]);
}

#[test]
fn test_shift_linearises_wrapped_content() {
    let buffer = RingBuffer::new(4);
    buffer.write(&[1, 2, 3]);
    buffer.write(&[4, 5]);
    assert_eq!(buffer.snapshot(), vec![2, 3, 4, 5]);

    buffer.shift(1);
    assert_eq!(buffer.snapshot(), vec![3, 4, 5]);
    buffer.write(&[6]);
    assert_eq!(buffer.snapshot(), vec![3, 4, 5, 6]);
}

#[test]
fn test_set_read_position_is_clamped() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[1, 2, 3]);
    assert_eq!(buffer.set_read_position(10), 3);
    assert_eq!(buffer.unread(), 0);
    assert_eq!(buffer.set_read_position(1), 1);
    assert_eq!(buffer.unread(), 2);
}

#[test]
fn test_clear_and_release() {
    let buffer = RingBuffer::new(8);
    buffer.write(&[1, 2, 3]);
    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 8);

    let mut out = [7u8; 2];
    buffer.read(&mut out);
    assert_eq!(out, [0, 0]);

    buffer.release();
    assert_eq!(buffer.capacity(), 0);
    assert_eq!(buffer.write(&[1, 2]), 0);
    buffer.shift(3);
    assert!(buffer.snapshot().is_empty());
}
