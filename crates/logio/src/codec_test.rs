//! Tests for the resettable compressor

use std::io::Write;

use crate::codec::ZstdWriter;

#[test]
fn test_round_trip() {
    let mut codec = ZstdWriter::with_level(Vec::new(), 3, 0).unwrap();

    let original = b"log line one\nlog line two\nlog line three\n";
    codec.write_all(original).unwrap();
    codec.close().unwrap();

    let compressed = codec.idle_mut().unwrap().clone();
    let decoded = zstd::stream::decode_all(&compressed[..]).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_round_trip_with_dictionary() {
    use std::io::Read;

    let dict_size = 4096;
    let mut codec = ZstdWriter::with_level(Vec::new(), 3, dict_size).unwrap();

    let original = b"dictionary-compressed payload\n";
    codec.write_all(original).unwrap();
    codec.close().unwrap();

    let compressed = codec.idle_mut().unwrap().clone();
    let dict = vec![0u8; dict_size];
    let mut decoder =
        zstd::stream::read::Decoder::with_dictionary(&compressed[..], &dict).unwrap();
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_close_is_idempotent() {
    let mut codec = ZstdWriter::with_level(Vec::new(), 3, 0).unwrap();
    codec.write_all(b"payload\n").unwrap();

    codec.close().unwrap();
    let first = codec.idle_mut().unwrap().clone();

    codec.close().unwrap();
    assert_eq!(codec.idle_mut().unwrap(), &first);
}

#[test]
fn test_write_after_close_fails() {
    let mut codec = ZstdWriter::with_level(Vec::new(), 3, 0).unwrap();
    codec.close().unwrap();

    let err = codec.write_all(b"late").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
}

#[test]
fn test_reset_starts_a_fresh_frame() {
    let mut codec = ZstdWriter::with_level(Vec::new(), 3, 0).unwrap();

    codec.write_all(b"first frame\n").unwrap();
    codec.close().unwrap();

    // Simulate logrotate: the finished frame moves away, the inner
    // writer starts empty again.
    let first = std::mem::take(codec.idle_mut().unwrap());
    assert_eq!(
        zstd::stream::decode_all(&first[..]).unwrap(),
        b"first frame\n"
    );

    codec.reset().unwrap();
    assert!(codec.is_open());

    codec.write_all(b"second frame\n").unwrap();
    codec.close().unwrap();
    let second = codec.idle_mut().unwrap().clone();
    assert_eq!(
        zstd::stream::decode_all(&second[..]).unwrap(),
        b"second frame\n"
    );
}

#[test]
fn test_idle_access_requires_closed_frame() {
    let mut codec = ZstdWriter::with_level(Vec::new(), 3, 0).unwrap();
    assert_eq!(
        codec.idle_mut().unwrap_err().kind(),
        std::io::ErrorKind::InvalidInput
    );
}
