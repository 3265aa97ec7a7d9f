//! Job types moved across the worker-pool channels
//!
//! Jobs are single-use values: the router consumes a [`HeaderJob`] and
//! produces a [`DumpJob`] or [`LogrotateJob`]; the dump and logrotate
//! pools consume those and resolve the optional acknowledgement so the
//! router can answer the client.

use std::net::SocketAddr;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

/// A freshly accepted connection, before its header was read
#[derive(Debug)]
pub struct HeaderJob {
    /// The accepted socket
    pub stream: TcpStream,
    /// Remote address, for logging
    pub peer: SocketAddr,
}

/// Routed payload to append to a destination
#[derive(Debug)]
pub struct DumpJob {
    /// Destination key (`group/path`)
    pub key: String,
    /// Body bytes as read from the connection
    pub body: Bytes,
    /// Resolves to true when the append succeeded
    pub ack: Option<oneshot::Sender<bool>>,
}

/// Rotation request for a destination
#[derive(Debug)]
pub struct LogrotateJob {
    /// Destination key (`group/path`)
    pub key: String,
    /// Where the current file should be renamed to
    pub new_path: PathBuf,
    /// Resolves to true when the rotation succeeded
    pub ack: Option<oneshot::Sender<bool>>,
}
