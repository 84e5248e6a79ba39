use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::{checksum16, CHECKSUM_LEN};
use crate::cobs::{self, decoded_capacity, encoded_capacity, DELIMITER};
use crate::error::{FrameError, Result};

/// Default maximum payload size: 1 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 1 MiB.
    pub max_payload_size: usize,
}

impl FrameConfig {
    /// Longest stuffed frame (excluding the delimiter) a payload of
    /// `max_payload_size` can produce.
    pub fn max_frame_size(&self) -> usize {
        max_stuffed_len(self.max_payload_size)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

fn max_stuffed_len(max_payload: usize) -> usize {
    encoded_capacity(max_payload + CHECKSUM_LEN)
}

/// Checksummed, byte-stuffed frame encoder/decoder.
///
/// Wire format of one message:
/// ```text
/// ┌──────────────────────────────────────────┬───────────┐
/// │ COBS( payload ++ checksum16(payload) )   │ 0x00      │
/// │ (no zero bytes)                          │ delimiter │
/// └──────────────────────────────────────────┴───────────┘
/// ```
///
/// The codec owns its scratch buffers and hands out slices borrowed from
/// them, so a result stays valid only until the next call on the same
/// instance. Copy it out (`to_vec()`, `Bytes::copy_from_slice`) to keep it.
/// Every operation takes `&mut self`; share an instance across threads only
/// behind a lock.
#[derive(Debug, Default)]
pub struct FrameCodec {
    frame: Vec<u8>,
    stuffed: Vec<u8>,
    max_payload: Option<usize>,
}

impl FrameCodec {
    /// Create a codec whose buffers grow on demand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with buffers pre-sized for `max_payload` bytes.
    ///
    /// Larger payloads are rejected instead of growing the buffers.
    pub fn with_max_payload(max_payload: usize) -> Self {
        let stuffed_len = max_stuffed_len(max_payload);
        Self {
            frame: vec![0; stuffed_len],
            stuffed: vec![0; stuffed_len + 1],
            max_payload: Some(max_payload),
        }
    }

    /// The configured payload limit, if any.
    pub fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }

    /// Checksum and stuff `payload`, returning the stuffed frame without a
    /// delimiter.
    pub fn encode_frame(&mut self, payload: &[u8]) -> Result<&[u8]> {
        let len = self.stuff(payload)?;
        Ok(&self.stuffed[..len])
    }

    /// Like [`encode_frame`](Self::encode_frame) but with the trailing
    /// delimiter appended, ready to be written to a stream.
    pub fn encode_wire(&mut self, payload: &[u8]) -> Result<&[u8]> {
        let len = self.stuff(payload)?;
        self.stuffed[len] = DELIMITER;
        Ok(&self.stuffed[..=len])
    }

    /// Unstuff a frame (without its delimiter), verify the checksum, and
    /// return the payload.
    pub fn decode_frame(&mut self, stuffed: &[u8]) -> Result<&[u8]> {
        if let Some(max) = self.max_payload {
            let max_frame = max_stuffed_len(max);
            if stuffed.len() > max_frame {
                return Err(FrameError::FrameTooLarge { max: max_frame });
            }
        }

        let required = decoded_capacity(stuffed.len());
        if self.frame.len() < required {
            self.frame.resize(required, 0);
        }

        let len = cobs::decode(stuffed, &mut self.frame)?;
        let body_len = verify_checksum(&self.frame[..len])?;
        Ok(&self.frame[..body_len])
    }

    fn stuff(&mut self, payload: &[u8]) -> Result<usize> {
        if let Some(max) = self.max_payload {
            if payload.len() > max {
                return Err(FrameError::PayloadTooLarge {
                    size: payload.len(),
                    max,
                });
            }
        }

        self.frame.clear();
        self.frame.extend_from_slice(payload);
        self.frame.extend_from_slice(&checksum16(payload));

        // One extra byte so encode_wire can append the delimiter in place.
        let required = encoded_capacity(self.frame.len()) + 1;
        if self.stuffed.len() < required {
            self.stuffed.resize(required, 0);
        }

        Ok(cobs::encode(&self.frame, &mut self.stuffed)?)
    }
}

/// Split the checksum trailer off an unstuffed frame and verify it.
///
/// Returns the payload length on success.
fn verify_checksum(frame: &[u8]) -> Result<usize> {
    if frame.len() < CHECKSUM_LEN {
        return Err(FrameError::MessageTooShort {
            len: frame.len(),
            min: CHECKSUM_LEN,
        });
    }

    let body_len = frame.len() - CHECKSUM_LEN;
    let received = [frame[body_len], frame[body_len + 1]];
    let calculated = checksum16(&frame[..body_len]);
    if calculated != received {
        return Err(FrameError::ChecksumMismatch {
            calculated,
            received,
        });
    }
    Ok(body_len)
}

/// Encode `payload` as a complete wire message (stuffed frame plus
/// delimiter) appended to `dst`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let mut frame = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&checksum16(payload));

    let start = dst.len();
    dst.resize(start + encoded_capacity(frame.len()), 0);
    let len = cobs::encode(&frame, &mut dst[start..])?;
    dst.truncate(start + len);
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Decode one stuffed frame (without its delimiter) into an owned payload.
pub fn decode_frame(stuffed: &[u8]) -> Result<Bytes> {
    let mut frame = cobs::decode_to_vec(stuffed)?;
    let body_len = verify_checksum(&frame)?;
    frame.truncate(body_len);
    Ok(Bytes::from(frame))
}
