//! Request/response exchanges over cobslink frames.
//!
//! A [`ReliableChannel`] writes one framed request, reads the framed response
//! against a per-attempt deadline, and retries the whole cycle up to a fixed
//! attempt budget. A [`Responder`] serves the other end of the exchange.

pub mod attempt;
pub mod channel;
pub mod config;
pub mod error;
pub mod responder;

pub use attempt::Attempt;
pub use channel::ReliableChannel;
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use responder::Responder;
