use std::time::Duration;

/// Errors that can occur during a request/response exchange.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The encoded request does not end with the frame delimiter.
    #[error("malformed request: encoded request must end with the 0x00 delimiter")]
    MalformedRequest,

    /// The transport accepted fewer bytes than the request holds.
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The stream reported end-of-stream before any response byte arrived.
    #[error("no data was read from the stream")]
    NoDataRead,

    /// No complete response arrived before the read deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The stream ended partway through a response frame.
    #[error("connection closed (incomplete frame, {buffered} bytes buffered)")]
    ConnectionClosed { buffered: usize },

    /// The response frame failed to decode or verify.
    #[error("frame error: {0}")]
    Frame(#[from] cobslink_frame::FrameError),

    /// Transport I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel configuration rejected.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ChannelError {
    /// Whether the attempt loop consumes an attempt on this error and tries again.
    ///
    /// Caller-contract and configuration errors are reported before any
    /// attempt starts.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            ChannelError::MalformedRequest | ChannelError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
