//! `tokio_util::codec` adapter for the delimiter-framed wire format.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::cobs::DELIMITER;
use crate::codec::{decode_frame, encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Async framing codec: one item per delimiter-terminated frame.
#[derive(Debug, Clone, Default)]
pub struct CobsFrameCodec {
    config: FrameConfig,
    scanned: usize,
}

impl CobsFrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self { config, scanned: 0 }
    }

    fn check_payload(&self, len: usize) -> Result<()> {
        if len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }
}

impl Decoder for CobsFrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        let found = src[self.scanned..].iter().position(|&b| b == DELIMITER);
        match found {
            Some(idx) => {
                let end = self.scanned + idx;
                let message = src.split_to(end + 1);
                self.scanned = 0;
                decode_frame(&message[..end]).map(Some)
            }
            None => {
                let max_frame = self.config.max_frame_size();
                if src.len() > max_frame {
                    src.clear();
                    self.scanned = 0;
                    return Err(FrameError::FrameTooLarge { max: max_frame });
                }
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Bytes> for CobsFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        self.check_payload(item.len())?;
        encode_frame(&item, dst)
    }
}

impl<'a> Encoder<&'a [u8]> for CobsFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        self.check_payload(item.len())?;
        encode_frame(item, dst)
    }
}
