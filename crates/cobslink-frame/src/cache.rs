//! Memoizing wrapper around [`FrameCodec`].

use std::collections::HashMap;

use bytes::Bytes;
use tracing::trace;

use crate::codec::FrameCodec;
use crate::error::Result;

/// A [`FrameCodec`] that remembers every successful encode and decode.
///
/// Keys are owned copies of the input, so mutating a buffer after a call
/// never corrupts the cache. Encode and decode results live in separate
/// maps. Failures are not cached. The cache grows without bound; call
/// [`clear`](Self::clear) when a long-lived instance sees unbounded input.
#[derive(Debug, Default)]
pub struct CachedFrameCodec {
    codec: FrameCodec,
    encoded: HashMap<Vec<u8>, Bytes>,
    decoded: HashMap<Vec<u8>, Bytes>,
}

impl CachedFrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing codec (e.g. one built with
    /// [`FrameCodec::with_max_payload`]).
    pub fn with_codec(codec: FrameCodec) -> Self {
        Self {
            codec,
            ..Self::default()
        }
    }

    /// Stuffed frame for `payload`, computed at most once per distinct input.
    pub fn encode_frame(&mut self, payload: &[u8]) -> Result<Bytes> {
        if let Some(hit) = self.encoded.get(payload) {
            trace!(len = payload.len(), "encode cache hit");
            return Ok(hit.clone());
        }
        let stuffed = Bytes::copy_from_slice(self.codec.encode_frame(payload)?);
        self.encoded.insert(payload.to_vec(), stuffed.clone());
        Ok(stuffed)
    }

    /// Payload for a stuffed frame, computed at most once per distinct input.
    pub fn decode_frame(&mut self, stuffed: &[u8]) -> Result<Bytes> {
        if let Some(hit) = self.decoded.get(stuffed) {
            trace!(len = stuffed.len(), "decode cache hit");
            return Ok(hit.clone());
        }
        let payload = Bytes::copy_from_slice(self.codec.decode_frame(stuffed)?);
        self.decoded.insert(stuffed.to_vec(), payload.clone());
        Ok(payload)
    }

    /// Total number of cached entries across both directions.
    pub fn len(&self) -> usize {
        self.encoded.len() + self.decoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.encoded.clear();
        self.decoded.clear();
    }
}
