use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::cobs::DELIMITER;
use crate::codec::{decode_frame, FrameConfig};
use crate::error::{FrameError, Result};

const CHUNK: usize = 4 * 1024;

/// Pulls delimiter-terminated frames off any `Read` stream.
///
/// Bytes that arrive after a delimiter stay buffered for the next call, so
/// back-to-back messages are never lost. A corrupt frame fails only its own
/// call: the reader has already consumed up to its delimiter and resumes
/// cleanly with the next message.
pub struct FrameReader<R> {
    stream: R,
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no delimiter.
    scanned: usize,
    max_frame: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    pub fn with_config(stream: R, config: FrameConfig) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(CHUNK),
            scanned: 0,
            max_frame: config.max_frame_size(),
        }
    }

    /// Block until the next complete frame arrives and return its payload.
    ///
    /// End of stream (with or without a partial frame buffered) is
    /// [`FrameError::ConnectionClosed`]. More than
    /// [`max_frame_size`](Self::max_frame_size) bytes without a delimiter is
    /// [`FrameError::FrameTooLarge`] and discards the buffered bytes.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(stuffed) = self.split_message() {
                return decode_frame(&stuffed);
            }
            if self.buf.len() > self.max_frame {
                self.buf.clear();
                self.scanned = 0;
                return Err(FrameError::FrameTooLarge {
                    max: self.max_frame,
                });
            }
            if self.fill()? == 0 {
                return Err(FrameError::ConnectionClosed);
            }
        }
    }

    /// One read from the stream into `buf`; `Interrupted` is retried.
    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Detach the first buffered message, minus its delimiter.
    fn split_message(&mut self) -> Option<BytesMut> {
        let Some(offset) = self.buf[self.scanned..]
            .iter()
            .position(|&b| b == DELIMITER)
        else {
            self.scanned = self.buf.len();
            return None;
        };
        let end = self.scanned + offset;
        let mut message = self.buf.split_to(end + 1);
        message.truncate(end);
        self.scanned = 0;
        Some(message)
    }

    /// Bytes received but not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Longest stuffed frame accepted before giving up on a delimiter.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame
    }

    pub fn get_ref(&self) -> &R {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.stream
    }

    pub fn into_inner(self) -> R {
        self.stream
    }
}
