use std::io::{Read, Write};

use cobslink_frame::{FrameCodec, FrameError, FrameReader, FrameWriter};
use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};

/// Serves the remote side of request/response exchanges.
///
/// Reads one request frame at a time, hands its payload to a handler, and
/// writes the handler's output back as a response frame.
pub struct Responder<T> {
    reader: FrameReader<T>,
    codec: FrameCodec,
}

impl<T: Read + Write> Responder<T> {
    pub fn new(stream: T) -> Self {
        Self {
            reader: FrameReader::new(stream),
            codec: FrameCodec::new(),
        }
    }

    /// Answer a single request.
    pub fn serve_one<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Vec<u8>,
    {
        let request = self.reader.read_frame()?;
        debug!(size = request.len(), "request received");
        let response = handler(&request);
        let wire = self.codec.encode_wire(&response)?;
        FrameWriter::new(self.reader.get_mut()).send_raw(wire)?;
        debug!(size = response.len(), "response sent");
        Ok(())
    }

    /// Answer requests until the peer disconnects. Returns the number of
    /// requests answered.
    ///
    /// Corrupt or oversized requests are logged and skipped; the client's
    /// retry resends them.
    pub fn serve<F>(&mut self, mut handler: F) -> Result<u64>
    where
        F: FnMut(&[u8]) -> Vec<u8>,
    {
        let mut served = 0u64;
        loop {
            match self.serve_one(&mut handler) {
                Ok(()) => served += 1,
                Err(ChannelError::Frame(FrameError::ConnectionClosed)) => {
                    info!(served, "peer disconnected");
                    return Ok(served);
                }
                Err(ChannelError::Frame(err)) if skippable(&err) => {
                    warn!(error = %err, "dropping unreadable request");
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        self.reader.get_ref()
    }

    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }
}

fn skippable(err: &FrameError) -> bool {
    err.is_integrity() || matches!(err, FrameError::FrameTooLarge { .. })
}
