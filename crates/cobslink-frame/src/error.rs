/// Errors produced by the byte-stuffing layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CobsError {
    /// The encode destination cannot hold the worst-case stuffed output.
    #[error("destination too small for encoding (required {required} bytes, got {actual})")]
    DestinationTooSmall { required: usize, actual: usize },

    /// The decode destination is smaller than the bytes about to be written.
    #[error("destination too short for decoding (required {required} bytes, got {actual})")]
    DestinationTooShort { required: usize, actual: usize },

    /// A code byte claims more following bytes than remain in the source.
    #[error("encoded message too short (code byte requires {required} bytes, got {actual})")]
    EncodedTooShort { required: usize, actual: usize },

    /// Stuffed data never contains the sentinel; a zero code byte is corrupt input.
    #[error("zero byte in stuffed data at offset {offset}")]
    ZeroInStuffed { offset: usize },
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Byte stuffing or unstuffing failed.
    #[error("byte stuffing error: {0}")]
    Cobs(#[from] CobsError),

    /// The unstuffed frame has no room for the checksum trailer.
    #[error("decoded message too short ({len} bytes, need at least {min})")]
    MessageTooShort { len: usize, min: usize },

    /// The received checksum trailer does not match the payload.
    #[error("checksum mismatch (calculated {calculated:?}, received {received:?})")]
    ChecksumMismatch {
        calculated: [u8; 2],
        received: [u8; 2],
    },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No delimiter was seen within the configured maximum frame size.
    #[error("frame too large (no delimiter within {max} bytes)")]
    FrameTooLarge { max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors caused by corrupted or truncated frame contents.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            FrameError::Cobs(_)
                | FrameError::MessageTooShort { .. }
                | FrameError::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
