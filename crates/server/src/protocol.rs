//! Connection header protocol
//!
//! Each connection carries exactly one request: a single ASCII header
//! line, then (for dumps) the raw body until EOF.
//!
//! ```text
//! DUMP <group> <path>\n<body bytes...>
//! ROTATE <group> <path>\n
//! ```
//!
//! The destination key is `<group>/<path>`. The server answers
//! `200 OK\n` or `500 ERR\n` once the job resolves. A malformed or
//! oversized header is a decode error: the connection is closed and the
//! error logged.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Upper bound on the header line, excluding the newline
pub const MAX_HEADER_LEN: usize = 4096;

/// Response written after a successful job
pub const RESPONSE_OK: &[u8] = b"200 OK\n";

/// Response written after a failed job
pub const RESPONSE_ERR: &[u8] = b"500 ERR\n";

/// Decoded connection header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Append the connection body to the destination
    Dump {
        /// Destination key (`group/path`)
        key: String,
    },
    /// Rotate the destination's current file
    Logrotate {
        /// Destination key (`group/path`)
        key: String,
    },
}

impl Request {
    /// The destination key of either variant
    pub fn key(&self) -> &str {
        match self {
            Request::Dump { key } | Request::Logrotate { key } => key,
        }
    }
}

/// Header decode failures; all of them close the connection
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Network failure while reading the header
    #[error("I/O error reading header: {0}")]
    Io(#[from] io::Error),

    /// Connection closed before a full header line arrived
    #[error("connection closed before the header line")]
    UnexpectedEof,

    /// Header line longer than [`MAX_HEADER_LEN`]
    #[error("header line exceeds {MAX_HEADER_LEN} bytes")]
    HeaderTooLong,

    /// Header did not match `<COMMAND> <group> <path>`
    #[error("malformed header: {0}")]
    Malformed(String),

    /// Group or path would escape the destination directory
    #[error("invalid destination component `{0}`")]
    InvalidKey(String),
}

/// Read and parse the header line from a buffered connection
///
/// Bytes after the newline stay in the reader; for dumps they are the
/// start of the body.
pub async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let mut line: Vec<u8> = Vec::with_capacity(128);

    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Err(ProtocolError::UnexpectedEof);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    line.extend_from_slice(&available[..pos]);
                    (pos + 1, true)
                }
                None => {
                    line.extend_from_slice(available);
                    (available.len(), false)
                }
            }
        };
        reader.consume(consumed);

        if line.len() > MAX_HEADER_LEN {
            return Err(ProtocolError::HeaderTooLong);
        }
        if done {
            break;
        }
    }

    parse_header(&line)
}

fn parse_header(line: &[u8]) -> Result<Request, ProtocolError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| ProtocolError::Malformed("header is not valid UTF-8".into()))?
        .trim_end_matches('\r');

    let mut fields = text.split_whitespace();
    let (Some(command), Some(group), Some(path), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ProtocolError::Malformed(format!(
            "expected `<COMMAND> <group> <path>`, got `{text}`"
        )));
    };

    validate_component(group)?;
    validate_component(path)?;
    let key = format!("{group}/{path}");

    match command {
        "DUMP" => Ok(Request::Dump { key }),
        "ROTATE" => Ok(Request::Logrotate { key }),
        other => Err(ProtocolError::Malformed(format!(
            "unknown command `{other}`"
        ))),
    }
}

/// Reject components that could climb out of the destination root
fn validate_component(component: &str) -> Result<(), ProtocolError> {
    let escapes = component.starts_with('/')
        || component.contains('\\')
        || component.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if escapes {
        return Err(ProtocolError::InvalidKey(component.to_string()));
    }
    Ok(())
}

/// Write the protocol response for a resolved job
pub async fn respond<W: tokio::io::AsyncWrite + Unpin>(writer: &mut W, ok: bool) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let response = if ok { RESPONSE_OK } else { RESPONSE_ERR };
    writer.write_all(response).await?;
    writer.flush().await
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod protocol_test;
