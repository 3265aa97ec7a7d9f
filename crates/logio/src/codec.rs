//! Resettable streaming compressor
//!
//! [`ZstdWriter`] wraps the downstream writer in a zstd streaming
//! encoder. Logrotate needs two operations a plain encoder does not
//! give us directly: `close` (finalize the current frame and hand the
//! inner writer back) and `reset` (start a fresh frame against the
//! re-opened file). The concrete encoder is only named inside the
//! factory closure, so swapping codecs is a factory change.

use std::io::{self, Write};

use zstd::stream::write::Encoder;

/// Builds a fresh encoder over the inner writer
///
/// Called once at construction and again on every [`ZstdWriter::reset`].
pub type CodecFactory<W> = Box<dyn Fn(W) -> io::Result<Encoder<'static, W>> + Send + Sync>;

enum State<W: Write> {
    /// A frame is in progress
    Open(Encoder<'static, W>),
    /// The last frame was finalized; the inner writer is parked here
    Idle(W),
    /// A finalize or reset failed and the inner writer is gone
    Poisoned,
}

/// Streaming compressor with close and reset semantics
pub struct ZstdWriter<W: Write> {
    state: State<W>,
    make: CodecFactory<W>,
}

impl<W: Write> ZstdWriter<W> {
    /// Wrap `writer`, building the encoder with `make`
    pub fn new(writer: W, make: CodecFactory<W>) -> io::Result<Self> {
        let enc = make(writer)?;
        Ok(Self {
            state: State::Open(enc),
            make,
        })
    }

    /// Wrap `writer` with a level and a dictionary buffer of
    /// `dict_size` zero bytes (zero disables the dictionary)
    pub fn with_level(writer: W, level: i32, dict_size: usize) -> io::Result<Self>
    where
        W: 'static,
    {
        let dict = vec![0u8; dict_size];
        Self::new(
            writer,
            Box::new(move |w| {
                if dict.is_empty() {
                    Encoder::new(w, level)
                } else {
                    Encoder::with_dictionary(w, level, &dict)
                }
            }),
        )
    }

    /// Whether a frame is currently in progress
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Finalize the current frame
    ///
    /// Idempotent within a logrotate cycle: closing an already idle
    /// codec is a no-op. A finalize failure poisons the codec.
    pub fn close(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Open(enc) => {
                let writer = enc.finish()?;
                self.state = State::Idle(writer);
                Ok(())
            }
            State::Idle(writer) => {
                self.state = State::Idle(writer);
                Ok(())
            }
            State::Poisoned => Err(poisoned()),
        }
    }

    /// Start a new frame after [`close`](Self::close)
    pub fn reset(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Idle(writer) => {
                let enc = (self.make)(writer)?;
                self.state = State::Open(enc);
                Ok(())
            }
            State::Open(enc) => {
                self.state = State::Open(enc);
                Ok(())
            }
            State::Poisoned => Err(poisoned()),
        }
    }

    /// Reach the inner writer through the encoder or the idle state
    pub fn frame_mut(&mut self) -> Option<&mut W> {
        match &mut self.state {
            State::Open(enc) => Some(enc.get_mut()),
            State::Idle(writer) => Some(writer),
            State::Poisoned => None,
        }
    }

    /// The inner writer, available only between close and reset
    pub fn idle_mut(&mut self) -> io::Result<&mut W> {
        match &mut self.state {
            State::Idle(writer) => Ok(writer),
            State::Open(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "codec frame still open",
            )),
            State::Poisoned => Err(poisoned()),
        }
    }
}

impl<W: Write> Write for ZstdWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            State::Open(enc) => enc.write(data),
            State::Idle(_) => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "codec is closed",
            )),
            State::Poisoned => Err(poisoned()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Open(enc) => enc.flush(),
            State::Idle(writer) => writer.flush(),
            State::Poisoned => Err(poisoned()),
        }
    }
}

fn poisoned() -> io::Error {
    io::Error::other("codec poisoned by an earlier failure")
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
