//! Tests for the frame buffer

use std::io::Write;

use crate::frame_writer::FrameWriter;

#[test]
fn test_buffers_until_flush() {
    let mut w = FrameWriter::with_capacity(Vec::new(), 64);

    w.write_all(b"abc").unwrap();
    assert!(w.get_ref().is_empty());

    FrameWriter::flush(&mut w).unwrap();
    assert_eq!(w.get_ref().as_slice(), b"abc");
}

#[test]
fn test_overflow_flushes_previous_frame() {
    let mut w = FrameWriter::with_capacity(Vec::new(), 8);

    w.write_all(b"aaaa").unwrap();
    w.write_all(b"bbbbbb").unwrap();

    // First frame was pushed out to make room.
    assert_eq!(w.get_ref().as_slice(), b"aaaa");

    FrameWriter::flush(&mut w).unwrap();
    assert_eq!(w.get_ref().as_slice(), b"aaaabbbbbb");
}

#[test]
fn test_oversized_chunk_bypasses_buffer() {
    let mut w = FrameWriter::with_capacity(Vec::new(), 4);

    w.write_all(b"xy").unwrap();
    w.write_all(b"0123456789").unwrap();

    assert_eq!(w.get_ref().as_slice(), b"xy0123456789");
}

#[test]
fn test_worth_flushing_tracks_writes() {
    let mut w = FrameWriter::with_capacity(Vec::new(), 64);
    assert!(!w.worth_flushing());

    w.write_all(b"data").unwrap();
    assert!(w.worth_flushing());

    FrameWriter::flush(&mut w).unwrap();
    assert!(!w.worth_flushing());

    // Flush with nothing new keeps the hint clear.
    FrameWriter::flush(&mut w).unwrap();
    assert!(!w.worth_flushing());
}
