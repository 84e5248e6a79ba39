//! Byte-stuffed, checksummed message framing for unreliable byte streams.
//!
//! Every message on the wire is:
//! - the payload followed by a 2-byte two-sum checksum,
//! - COBS-stuffed so the result contains no zero bytes,
//! - terminated by a single `0x00` delimiter.
//!
//! The first zero a receiver sees always ends the current message, so a
//! receiver can resynchronize after corruption by skipping to the next
//! delimiter.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod cache;
pub mod checksum;
pub mod cobs;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::CobsFrameCodec;
pub use cache::CachedFrameCodec;
pub use checksum::{checksum16, Checksum16, CHECKSUM_LEN};
pub use cobs::{encoded_capacity, DELIMITER};
pub use codec::{decode_frame, encode_frame, FrameCodec, FrameConfig, DEFAULT_MAX_PAYLOAD};
pub use error::{CobsError, FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
