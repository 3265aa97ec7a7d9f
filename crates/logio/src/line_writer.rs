//! Line-integrity buffering
//!
//! [`LineWriter`] is a buffered writer which takes care of line
//! integrity: the writer beneath will only ever receive complete
//! newline-terminated records. A trailing chunk without a newline is
//! staged until its terminating newline arrives in a later write.
//!
//! # Write accounting
//!
//! [`LineWriter::push`] returns the number of bytes that crossed a
//! newline boundary during the call: committed bytes plus any
//! previously staged bytes whose terminating newline was observed in
//! this call. Bytes left in the staging area are counted once their
//! newline arrives. The `io::Write` impl consumes the same way but
//! reports the full chunk length, per the standard contract:
//!
//! ```
//! use std::io::Write;
//! use carrier_logio::LineWriter;
//!
//! let mut w = LineWriter::with_capacity(Vec::new(), 1024);
//! assert_eq!(w.push(b"1\n2\n3\n456").unwrap(), 6);
//! assert_eq!(w.push(b"78\n").unwrap(), 6); // "45678\n" completed
//! assert_eq!(w.write(b"tail").unwrap(), 4); // staged, fully consumed
//! ```

use std::io::{self, Write};

use bytes::{BufMut, BytesMut};
use thiserror::Error;

/// Default capacity for the committed-lines buffer (128 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024 * 1024;

/// Initial capacity reserved for the partial-line staging area
const STAGING_RESERVE: usize = 8 * 1024;

/// Errors raised when restoring a [`LineWriter`] checkpoint
///
/// A failed restore is a hard error: the caller must not resume with a
/// partially initialized writer.
#[derive(Debug, Error)]
pub enum StateError {
    /// Input ended before the named field could be read
    #[error("checkpoint truncated while reading {field}")]
    Truncated { field: &'static str },

    /// A boolean field held something other than 0 or 1
    #[error("checkpoint has invalid {field} flag: {value:#x}")]
    InvalidFlag { field: &'static str, value: u8 },

    /// Bytes remained after the last field
    #[error("checkpoint has {0} trailing bytes")]
    TrailingBytes(usize),
}

/// Buffered writer that only passes whole newline-terminated lines
/// downstream
///
/// Holds two buffers: `committed` (finalized lines, flushed to the
/// underlying writer on [`flush`](Self::flush)) and `staging` (the tail
/// of the input since the last newline). `finished` records whether the
/// previous chunk ended on a newline; when it is true the staging area
/// is empty.
pub struct LineWriter<W: Write> {
    capacity: usize,
    writer: W,
    committed: Vec<u8>,
    staging: Vec<u8>,
    finished: bool,

    line_count: u32,
    saved_line_count: u32,
    prev_line_count: u32,

    worth_flushing: bool,
}

impl<W: Write> LineWriter<W> {
    /// Create a writer with the default committed-buffer capacity
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer whose committed buffer flushes once `capacity`
    /// bytes would be exceeded
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            capacity,
            writer,
            committed: Vec::with_capacity(capacity.min(DEFAULT_BUFFER_SIZE)),
            staging: Vec::with_capacity(STAGING_RESERVE),
            finished: true,
            line_count: 0,
            saved_line_count: 0,
            prev_line_count: 0,
            worth_flushing: true,
        }
    }

    /// Append a chunk, partitioning at newline bytes
    ///
    /// Every byte of `data` is consumed: complete lines (prepended with
    /// any staged partial line) move to the committed buffer, a trailing
    /// chunk without a newline is staged. Returns the number of bytes
    /// that crossed a newline boundary during this call; bytes left in
    /// the staging area are counted once their terminating newline
    /// arrives in a later call. The `io::Write` impl wraps this and
    /// reports the full consumed length instead.
    pub fn push(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut rest = data;
        let mut crossed = 0usize;

        while !rest.is_empty() {
            let Some(pos) = rest.iter().position(|&b| b == b'\n') else {
                self.staging.extend_from_slice(rest);
                self.finished = false;
                return Ok(crossed);
            };
            let chunk = &rest[..=pos];

            let line_len = if self.finished {
                chunk.len()
            } else {
                self.staging.len() + chunk.len()
            };

            if self.committed.len() + line_len > self.capacity {
                self.worth_flushing = false;
                self.flush()?;
            }

            if !self.finished {
                self.committed.append(&mut self.staging);
            }
            self.committed.extend_from_slice(chunk);

            crossed += line_len;
            self.line_count += 1;
            self.finished = true;
            rest = &rest[pos + 1..];
        }
        Ok(crossed)
    }

    /// Flush all committed lines to the underlying writer
    ///
    /// The staging area is untouched; use [`flush_all`](Self::flush_all)
    /// at graceful close to drain it.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.committed.is_empty() {
            self.writer.write_all(&self.committed)?;
            self.committed.clear();
        }
        self.saved_line_count = self.line_count;
        Ok(())
    }

    /// Flush committed lines and drain the staging area
    ///
    /// Only used at graceful close: the bytes leaving the staging area
    /// are, by definition, a partial line.
    pub fn flush_all(&mut self) -> io::Result<()> {
        self.flush()?;
        if !self.staging.is_empty() {
            self.writer.write_all(&self.staging)?;
            self.staging.clear();
        }
        Ok(())
    }

    /// How many lines are buffered but not yet flushed
    pub fn lines_buffered(&self) -> u32 {
        self.line_count - self.saved_line_count
    }

    /// How many lines were flushed to the underlying writer
    pub fn lines_written(&self) -> u32 {
        self.saved_line_count
    }

    /// Idle-but-dirty predicate for the background flusher
    ///
    /// True iff the hint flag is set, there is something to flush, and
    /// no flush happened since the previous check (the stream looks
    /// idle). The call advances the previous-count marker and re-arms
    /// the hint, so a hot stream that keeps flushing on its own reports
    /// false here and is left alone.
    pub fn worth_flushing(&mut self) -> bool {
        let res = self.worth_flushing
            && self.saved_line_count != self.line_count
            && self.saved_line_count == self.prev_line_count;
        self.prev_line_count = self.saved_line_count;
        self.worth_flushing = true;
        res
    }

    /// Access the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Mutable access to the underlying writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Serialize the complete writer state
    ///
    /// Fields are length-prefixed and big-endian, in a fixed order; see
    /// [`restore_state`](Self::restore_state) for the inverse.
    pub fn dump_state(&self, dest: &mut BytesMut) {
        dest.put_u32(self.capacity as u32);
        dest.put_u32(self.committed.len() as u32);
        dest.put_slice(&self.committed);
        dest.put_u32(self.staging.len() as u32);
        dest.put_slice(&self.staging);
        dest.put_u8(self.finished as u8);
        dest.put_u32(self.line_count);
        dest.put_u32(self.saved_line_count);
        dest.put_u32(self.prev_line_count);
        dest.put_u8(self.worth_flushing as u8);
    }

    /// Restore state previously produced by [`dump_state`](Self::dump_state)
    ///
    /// Replaces every field of `self`. Short or malformed input is
    /// rejected without modifying the writer.
    pub fn restore_state(&mut self, src: &[u8]) -> Result<(), StateError> {
        let mut r = StateReader::new(src);

        let capacity = r.u32("bufsize")?;
        let committed_len = r.u32("buffer length")?;
        let committed = r.bytes(committed_len as usize, "buffer")?;
        let staging_len = r.u32("line buffer length")?;
        let staging = r.bytes(staging_len as usize, "line buffer")?;
        let finished = r.bool("finished")?;
        let line_count = r.u32("line count")?;
        let saved_line_count = r.u32("saved line count")?;
        let prev_line_count = r.u32("previous line count")?;
        let worth_flushing = r.bool("worth flushing")?;
        r.finish()?;

        self.capacity = capacity as usize;
        self.committed.clear();
        self.committed.extend_from_slice(committed);
        self.staging.clear();
        self.staging.extend_from_slice(staging);
        self.finished = finished;
        self.line_count = line_count;
        self.saved_line_count = saved_line_count;
        self.prev_line_count = prev_line_count;
        self.worth_flushing = worth_flushing;
        Ok(())
    }
}

impl<W: Write> Write for LineWriter<W> {
    /// Consume the whole chunk (staging any trailing partial line) and
    /// report `data.len()`, as the `Write` contract requires; the
    /// newline-crossed count is available from [`push`](LineWriter::push)
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.push(data)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        LineWriter::flush(self)
    }
}

/// Cursor over checkpoint bytes with typed field errors
struct StateReader<'a> {
    rest: &'a [u8],
}

impl<'a> StateReader<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { rest: src }
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, StateError> {
        if self.rest.len() < 4 {
            return Err(StateError::Truncated { field });
        }
        let (head, tail) = self.rest.split_at(4);
        self.rest = tail;
        Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
    }

    fn bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], StateError> {
        if self.rest.len() < len {
            return Err(StateError::Truncated { field });
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    fn bool(&mut self, field: &'static str) -> Result<bool, StateError> {
        let Some((&value, tail)) = self.rest.split_first() else {
            return Err(StateError::Truncated { field });
        };
        self.rest = tail;
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(StateError::InvalidFlag { field, value }),
        }
    }

    fn finish(self) -> Result<(), StateError> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(StateError::TrailingBytes(self.rest.len()))
        }
    }
}

#[cfg(test)]
#[path = "line_writer_test.rs"]
mod line_writer_test;
