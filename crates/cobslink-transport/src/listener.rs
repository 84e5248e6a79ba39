use std::net::TcpListener;

use tracing::{debug, info};

use crate::addr::LinkAddr;
use crate::error::{Result, TransportError};
use crate::traits::LinkStream;
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// Listening endpoint for either transport.
pub enum LinkListener {
    #[cfg(unix)]
    Unix(UnixDomainSocket),
    Tcp(TcpListener),
}

impl LinkListener {
    /// Bind and listen at `addr`.
    ///
    /// A TCP port of `0` picks an ephemeral port; see
    /// [`local_addr`](Self::local_addr) for the one actually bound.
    pub fn bind(addr: &LinkAddr) -> Result<Self> {
        match addr {
            #[cfg(unix)]
            LinkAddr::Unix(path) => Ok(Self::Unix(UnixDomainSocket::bind(path)?)),
            LinkAddr::Tcp(host_port) => {
                let listener =
                    TcpListener::bind(host_port.as_str()).map_err(|source| TransportError::Bind {
                        addr: addr.to_string(),
                        source,
                    })?;
                info!(%addr, "listening on tcp");
                Ok(Self::Tcp(listener))
            }
        }
    }

    /// Accept one connection (blocking).
    pub fn accept(&self) -> Result<LinkStream> {
        match self {
            #[cfg(unix)]
            Self::Unix(socket) => socket.accept(),
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().map_err(TransportError::Accept)?;
                stream.set_nodelay(true)?;
                debug!(%peer, "accepted tcp connection");
                Ok(LinkStream::from_tcp(stream))
            }
        }
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<LinkAddr> {
        match self {
            #[cfg(unix)]
            Self::Unix(socket) => Ok(LinkAddr::Unix(socket.path().to_path_buf())),
            Self::Tcp(listener) => Ok(LinkAddr::Tcp(listener.local_addr()?.to_string())),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        match self {
            #[cfg(unix)]
            Self::Unix(_) => "unix-domain-socket",
            Self::Tcp(_) => "tcp",
        }
    }
}
