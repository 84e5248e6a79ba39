use std::fmt;
#[cfg(unix)]
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Where a link endpoint lives.
///
/// Parsed from `tcp:HOST:PORT`, `unix:PATH`, or a bare filesystem path
/// (treated as a Unix domain socket).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAddr {
    /// Unix domain socket at a filesystem path.
    #[cfg(unix)]
    Unix(PathBuf),
    /// TCP `host:port`.
    Tcp(String),
}

impl LinkAddr {
    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            #[cfg(unix)]
            LinkAddr::Unix(_) => "unix-domain-socket",
            LinkAddr::Tcp(_) => "tcp",
        }
    }
}

impl FromStr for LinkAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(host_port) = s.strip_prefix("tcp:") {
            if host_port.rsplit_once(':').is_none_or(|(host, port)| {
                host.is_empty() || port.parse::<u16>().is_err()
            }) {
                return Err(TransportError::InvalidAddress(s.to_string()));
            }
            return Ok(LinkAddr::Tcp(host_port.to_string()));
        }

        let path = s.strip_prefix("unix:").unwrap_or(s);
        if path.is_empty() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        unix_addr(path).ok_or_else(|| TransportError::InvalidAddress(s.to_string()))
    }
}

#[cfg(unix)]
fn unix_addr(path: &str) -> Option<LinkAddr> {
    Some(LinkAddr::Unix(PathBuf::from(path)))
}

#[cfg(not(unix))]
fn unix_addr(_path: &str) -> Option<LinkAddr> {
    None
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            LinkAddr::Unix(path) => write!(f, "unix:{}", path.display()),
            LinkAddr::Tcp(host_port) => write!(f, "tcp:{host_port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp() {
        let addr: LinkAddr = "tcp:127.0.0.1:7000".parse().unwrap();
        assert_eq!(addr, LinkAddr::Tcp("127.0.0.1:7000".to_string()));
        assert_eq!(addr.to_string(), "tcp:127.0.0.1:7000");
        assert_eq!(addr.transport_name(), "tcp");
    }

    #[test]
    fn rejects_bad_tcp() {
        assert!("tcp:localhost".parse::<LinkAddr>().is_err());
        assert!("tcp::80".parse::<LinkAddr>().is_err());
        assert!("tcp:host:notaport".parse::<LinkAddr>().is_err());
    }

    #[test]
    #[cfg(unix)]
    fn parses_unix_forms() {
        let prefixed: LinkAddr = "unix:/tmp/link.sock".parse().unwrap();
        let bare: LinkAddr = "/tmp/link.sock".parse().unwrap();
        assert_eq!(prefixed, bare);
        assert_eq!(bare.to_string(), "unix:/tmp/link.sock");
        assert_eq!(bare.transport_name(), "unix-domain-socket");
    }

    #[test]
    fn rejects_empty() {
        assert!("".parse::<LinkAddr>().is_err());
        assert!("unix:".parse::<LinkAddr>().is_err());
    }
}
