//! Blocking stream transports for cobslink exchanges.
//!
//! Provides a [`Transport`] trait (a byte stream whose next read can be
//! bounded by a timeout) and concrete endpoints over:
//! - Unix domain sockets (Linux/macOS)
//! - TCP
//!
//! This is the lowest layer of cobslink. Frames and channels build on top of
//! it.

pub mod addr;
pub mod error;
pub mod listener;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use addr::LinkAddr;
pub use error::{Result, TransportError};
pub use listener::LinkListener;
pub use traits::{LinkStream, Transport};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
