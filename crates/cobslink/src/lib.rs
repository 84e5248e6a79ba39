//! Checksummed COBS framing and retrying request/response exchanges for
//! unreliable byte streams such as serial links.
//!
//! # Crate Structure
//!
//! - [`frame`]: byte stuffing, the two-sum checksum, frame codecs and
//!   streaming readers/writers (plus a tokio codec behind the `async` feature)
//! - [`transport`]: the read-with-timeout [`transport::Transport`] seam and
//!   Unix socket / TCP endpoints
//! - [`channel`]: [`channel::ReliableChannel`] exchanges with bounded retries,
//!   and the [`channel::Responder`] that answers them
//!
//! ```no_run
//! use cobslink::channel::{ChannelConfig, ReliableChannel};
//! use cobslink::transport::{LinkAddr, LinkStream};
//!
//! let addr: LinkAddr = "tcp:127.0.0.1:7000".parse()?;
//! let stream = LinkStream::connect(&addr)?;
//! let mut channel = ReliableChannel::new(stream, ChannelConfig::default())?;
//! let reply = channel.request(b"status")?;
//! println!("{} bytes", reply.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export frame types.
pub mod frame {
    pub use cobslink_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use cobslink_transport::*;
}

/// Re-export channel types.
pub mod channel {
    pub use cobslink_channel::*;
}
