use std::io::{self, ErrorKind, Write};

use crate::codec::{FrameCodec, FrameConfig};
use crate::error::{FrameError, Result};

/// Emits one delimiter-terminated wire message per [`send`](Self::send).
///
/// `Interrupted` and `WouldBlock` are retried in place. A stream that accepts
/// zero bytes is treated as closed.
pub struct FrameWriter<W> {
    stream: W,
    codec: FrameCodec,
    limit: usize,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    pub fn with_config(stream: W, config: FrameConfig) -> Self {
        Self {
            stream,
            codec: FrameCodec::new(),
            limit: config.max_payload_size,
        }
    }

    /// Frame `payload`, write it with its delimiter, and flush.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.limit {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.limit,
            });
        }
        let wire = self.codec.encode_wire(payload)?;
        write_fully(&mut self.stream, wire)?;
        flush_fully(&mut self.stream)
    }

    /// Write bytes that already form a complete wire message, and flush.
    pub fn send_raw(&mut self, wire: &[u8]) -> Result<()> {
        write_fully(&mut self.stream, wire)?;
        flush_fully(&mut self.stream)
    }

    pub fn flush(&mut self) -> Result<()> {
        flush_fully(&mut self.stream)
    }

    /// Largest payload [`send`](Self::send) accepts.
    pub fn max_payload_size(&self) -> usize {
        self.limit
    }

    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.stream
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
}

fn write_fully<W: Write>(stream: &mut W, mut wire: &[u8]) -> Result<()> {
    while !wire.is_empty() {
        match stream.write(wire) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => wire = &wire[n..],
            Err(err) if is_transient(&err) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn flush_fully<W: Write>(stream: &mut W) -> Result<()> {
    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if is_transient(&err) => {}
            Err(err) => return Err(err.into()),
        }
    }
}
