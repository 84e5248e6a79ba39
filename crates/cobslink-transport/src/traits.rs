use std::io::{self, Cursor, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use tracing::debug;

use crate::addr::LinkAddr;
use crate::error::{Result, TransportError};

/// A duplex byte stream an exchange can run over.
///
/// Beyond blocking `Read`/`Write`, a transport must let the caller bound how
/// long the next read may block, otherwise a read deadline cannot be
/// enforced against a silent peer. The default implementation does nothing,
/// which suits in-memory streams whose reads return immediately.
pub trait Transport: Read + Write {
    /// Limit subsequent blocking reads to `timeout` (`None` blocks forever).
    ///
    /// An expired read must surface as `WouldBlock` or `TimedOut`.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let _ = timeout;
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }
}

impl Transport for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

#[cfg(unix)]
impl Transport for UnixStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        UnixStream::set_read_timeout(self, timeout)
    }
}

impl Transport for Cursor<Vec<u8>> {}

/// A connected link stream (Unix domain socket or TCP).
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl LinkStream {
    /// Connect to a listening endpoint (blocking).
    pub fn connect(addr: &LinkAddr) -> Result<Self> {
        let connect_err = |source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        };
        let stream = match addr {
            #[cfg(unix)]
            LinkAddr::Unix(path) => {
                Self::from_unix(UnixStream::connect(path).map_err(connect_err)?)
            }
            LinkAddr::Tcp(host_port) => {
                let stream = TcpStream::connect(host_port.as_str()).map_err(connect_err)?;
                // Frames are small and latency-bound.
                stream.set_nodelay(true)?;
                Self::from_tcp(stream)
            }
        };
        debug!(%addr, "connected link stream");
        Ok(stream)
    }

    #[cfg(unix)]
    pub fn from_unix(stream: UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }

    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: LinkStreamInner::Tcp(stream),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            LinkStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => "unix-domain-socket",
            LinkStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
            LinkStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
            LinkStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
            LinkStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl Transport for LinkStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => Transport::set_read_timeout(stream, timeout),
            LinkStreamInner::Tcp(stream) => Transport::set_read_timeout(stream, timeout),
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
