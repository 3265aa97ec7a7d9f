//! Tests for the connection header protocol

use std::io::Cursor;

use tokio::io::AsyncReadExt;

use crate::protocol::{MAX_HEADER_LEN, ProtocolError, Request, read_request};

async fn parse(input: &[u8]) -> Result<Request, ProtocolError> {
    let mut reader = Cursor::new(input.to_vec());
    read_request(&mut reader).await
}

#[tokio::test]
async fn test_dump_header() {
    let request = parse(b"DUMP web nginx/access.log\n").await.unwrap();
    assert_eq!(
        request,
        Request::Dump {
            key: "web/nginx/access.log".into()
        }
    );
}

#[tokio::test]
async fn test_rotate_header() {
    let request = parse(b"ROTATE web access.log\n").await.unwrap();
    assert_eq!(
        request,
        Request::Logrotate {
            key: "web/access.log".into()
        }
    );
    assert_eq!(request.key(), "web/access.log");
}

#[tokio::test]
async fn test_body_stays_in_reader() {
    let mut reader = Cursor::new(b"DUMP web app.log\nline one\nline two\n".to_vec());
    let request = read_request(&mut reader).await.unwrap();
    assert_eq!(request.key(), "web/app.log");

    let mut body = Vec::new();
    reader.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"line one\nline two\n");
}

#[tokio::test]
async fn test_crlf_header_accepted() {
    let request = parse(b"DUMP web app.log\r\n").await.unwrap();
    assert_eq!(request.key(), "web/app.log");
}

#[tokio::test]
async fn test_unknown_command_rejected() {
    let err = parse(b"PURGE web app.log\n").await.unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    for header in [&b"DUMP\n"[..], b"DUMP web\n", b"DUMP a b c d\n", b"\n"] {
        let err = parse(header).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)), "{header:?}");
    }
}

#[tokio::test]
async fn test_eof_before_newline() {
    let err = parse(b"DUMP web app.log").await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnexpectedEof));
}

#[tokio::test]
async fn test_oversized_header_rejected() {
    let mut input = b"DUMP web ".to_vec();
    input.extend(std::iter::repeat_n(b'a', MAX_HEADER_LEN + 1));
    input.push(b'\n');

    let err = parse(&input).await.unwrap_err();
    assert!(matches!(err, ProtocolError::HeaderTooLong));
}

#[tokio::test]
async fn test_traversal_components_rejected() {
    for header in [
        &b"DUMP ../etc passwd\n"[..],
        b"DUMP web ../../etc/passwd\n",
        b"DUMP web /etc/passwd\n",
        b"DUMP web a//b\n",
        b"DUMP web ./a\n",
        b"DUMP we\\b a\n",
    ] {
        let err = parse(header).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidKey(_)), "{header:?}");
    }
}

#[tokio::test]
async fn test_invalid_utf8_rejected() {
    let err = parse(b"DUMP w\xff\xfe app.log\n").await.unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}
