//! Bounded frame buffer in front of the file descriptor
//!
//! [`FrameWriter`] amortizes syscalls: writes accumulate in a fixed
//! buffer and reach the underlying writer in whole frames. Unlike
//! [`LineWriter`](crate::LineWriter) it knows nothing about record
//! boundaries; it sits between the compressor output and the file.

use std::io::{self, Write};

/// Default frame buffer capacity (256 KiB)
const DEFAULT_FRAME_SIZE: usize = 256 * 1024;

/// Fixed-size write buffer with a dirty-since-flush hint
pub struct FrameWriter<W: Write> {
    capacity: usize,
    buf: Vec<u8>,
    writer: W,
    dirty: bool,
}

impl<W: Write> FrameWriter<W> {
    /// Create a frame writer with the default capacity
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, DEFAULT_FRAME_SIZE)
    }

    /// Create a frame writer buffering up to `capacity` bytes
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            capacity,
            buf: Vec::with_capacity(capacity),
            writer,
            dirty: false,
        }
    }

    /// Push buffered bytes to the underlying writer and clear the hint
    ///
    /// A flush with nothing buffered and nothing written since the last
    /// flush is a complete no-op, so repeated closes higher in the stack
    /// never touch an already released file.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.writer.write_all(&self.buf)?;
            self.buf.clear();
        }
        if self.dirty {
            self.writer.flush()?;
            self.dirty = false;
        }
        Ok(())
    }

    /// True iff bytes were written since the previous flush
    pub fn worth_flushing(&self) -> bool {
        self.dirty
    }

    /// Access the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Mutable access to the underlying writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl<W: Write> Write for FrameWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.buf.len() + data.len() > self.capacity {
            self.flush()?;
        }
        if data.len() >= self.capacity {
            // Oversized chunk: the buffer is empty now, bypass it.
            self.writer.write_all(data)?;
        } else {
            self.buf.extend_from_slice(data);
        }
        self.dirty = true;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        FrameWriter::flush(self)
    }
}

#[cfg(test)]
#[path = "frame_writer_test.rs"]
mod frame_writer_test;
