//! Carrier ingestion pipeline
//!
//! Wires the per-destination write stacks from `carrier-logio` into a
//! TCP server:
//!
//! ```text
//! Listener ─→ header channel ─→ RouterPool ─┬→ dump channel ─→ DumpPool
//!                                           └→ rotate channel ─→ LogrotatePool
//!                                                     both via FileRegistry
//! ```
//!
//! The [`FileRegistry`] maps destination keys to lazily constructed
//! [`Bufferer`](carrier_logio::Bufferer)s, each behind an entry lock
//! that serializes writers, rotators and the background flusher. The
//! flusher ticks on a configurable cadence, try-locking each entry and
//! flushing only idle-but-dirty buffers, so hot destinations are never
//! stalled.
//!
//! [`Server`] assembles everything from a [`Config`](carrier_config::Config)
//! and runs until the supplied cancellation token fires, then drains the
//! pools and closes every destination.

mod debug;
mod error;
mod factory;
mod jobs;
mod listener;
mod metrics;
mod pools;
mod protocol;
mod registry;
mod server;

pub use debug::{DebugState, spawn_debug_server};
pub use error::ServerError;
pub use factory::build_factory;
pub use jobs::{DumpJob, HeaderJob, LogrotateJob};
pub use listener::Listener;
pub use metrics::{FlusherMetrics, FlusherSnapshot, PoolMetrics, PoolSnapshot, ServerStats};
pub use pools::{DumpPool, LogrotatePool, RotateNamer, RouterContext, RouterPool, default_namer};
pub use protocol::{ProtocolError, RESPONSE_ERR, RESPONSE_OK, Request, read_request, respond};
pub use registry::{FileEntry, FileRegistry};
pub use server::Server;
