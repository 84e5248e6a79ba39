use std::path::PathBuf;

/// Errors that can occur in transport setup and I/O.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {}", .path.display())]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The address string could not be parsed.
    #[error("invalid transport address '{0}' (expected tcp:HOST:PORT, unix:PATH or a socket path)")]
    InvalidAddress(String),
}

impl TransportError {
    /// The underlying I/O error, if this error wraps one.
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Some(source)
            }
            TransportError::Accept(err) | TransportError::Io(err) => Some(err),
            TransportError::PathTooLong { .. } | TransportError::InvalidAddress(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
