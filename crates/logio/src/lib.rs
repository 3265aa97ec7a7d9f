//! Layered buffered writers with log-line integrity
//!
//! This crate provides the per-destination write stack used by the
//! carrier server. Each destination owns one [`Bufferer`], a composite
//! of up to four layers:
//!
//! ```text
//! LineWriter ─→ (ZstdWriter) ─→ (FrameWriter) ─→ DestFile
//! ```
//!
//! - [`LineWriter`] buffers incoming chunks so that the writer beneath
//!   only ever observes complete newline-terminated records.
//! - [`ZstdWriter`] is an optional streaming compressor that can be
//!   closed (finalizing the current frame) and reset (starting a new
//!   frame), which logrotate relies on.
//! - [`FrameWriter`] is a plain bounded buffer amortizing syscalls in
//!   front of the file descriptor.
//! - [`DestFile`] is an append-mode file beneath a [`Root`] directory
//!   that supports close-rename-reopen for logrotate.
//!
//! The [`LineWriter`] additionally supports binary state checkpointing
//! ([`LineWriter::dump_state`] / [`LineWriter::restore_state`]) so a
//! restarted process can resume with its partial-line staging intact.

mod bufferer;
mod codec;
mod dest_file;
mod frame_writer;
mod line_writer;

pub use bufferer::{Bufferer, BuffererFactory, RawBufferer, ZstdBufferer, ZstdParams};
pub use codec::{CodecFactory, ZstdWriter};
pub use dest_file::{DestFile, Root};
pub use frame_writer::FrameWriter;
pub use line_writer::{LineWriter, StateError, DEFAULT_BUFFER_SIZE};
