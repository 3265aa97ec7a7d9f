//! Server error types

use std::io;

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors raised by the ingestion pipeline
///
/// Only [`Bind`](Self::Bind) and [`DestDirMissing`](Self::DestDirMissing)
/// are fatal; everything else is logged by the worker that hit it and
/// the stream or job is dropped.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the ingestion or debug listener
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address we tried to listen on
        address: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// The configured destination directory does not exist
    #[error("destination directory {0} does not exist")]
    DestDirMissing(String),

    /// Logrotate was requested for a key no stream has written to
    #[error("destination `{0}` not found")]
    NotFound(String),

    /// The entry lock was not acquired within the configured wait
    #[error("timed out waiting for the entry lock on `{0}`")]
    LockTimeout(String),

    /// I/O failure against a destination's write stack
    #[error("I/O error on `{key}`: {source}")]
    Destination {
        /// Destination key
        key: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Malformed or unreadable connection header
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Network failure on an accepted connection
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),

    /// A job channel closed while the pipeline was still running
    #[error("job channel closed")]
    ChannelClosed,
}

impl ServerError {
    pub(crate) fn destination(key: impl Into<String>, source: io::Error) -> Self {
        Self::Destination {
            key: key.into(),
            source,
        }
    }
}
