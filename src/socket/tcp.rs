//! TCP transport dialer.
//!
//! Opens a single TCP connection to a literal IP and port. Hostnames are
//! accepted as a pass-through mode (OS-level resolution via the runtime's
//! `lookup_host`) for configurations that disable the DNS layer; the
//! dual-stack dialer always hands this dialer literal IPs.

use crate::base::context::IoResultExt;
use crate::base::neterror::{DialPhase, Errno, NetError};
use crate::base::uri::ParsedUri;
use crate::connector::{Connecting, Connector};
use crate::socket::stream::Connection;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpSocket;
use tokio_util::sync::CancellationToken;

/// Socket options applied to outgoing TCP connections.
#[derive(Debug, Clone, Default)]
pub struct TcpOptions {
    /// Local address to bind before connecting.
    pub bind_address: Option<IpAddr>,
    /// Disable Nagle's algorithm on the connected socket.
    pub nodelay: bool,
}

/// Dials one TCP connection per `connect()` call.
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    options: TcpOptions,
}

impl TcpDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TcpOptions) -> Self {
        Self { options }
    }

    async fn dial(uri: String, options: TcpOptions, cancel: CancellationToken) -> Result<Connection, NetError> {
        let parsed = ParsedUri::parse(&uri, "tcp")?;
        if parsed.scheme() != "tcp" {
            return Err(NetError::invalid_uri(&uri));
        }
        let host = parsed.host().ok_or_else(|| NetError::invalid_uri(&uri))?.to_string();
        let port = parsed.port().ok_or_else(|| NetError::invalid_uri(&uri))?;

        let addr = match parsed.ip_literal() {
            Some(ip) => SocketAddr::new(ip, port),
            None => {
                // Pass-through mode: let the OS resolve the hostname.
                let lookup = tokio::net::lookup_host((host.as_str(), port));
                let mut addrs = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(NetError::cancelled(&uri, DialPhase::Connect));
                    }
                    res = lookup => res.connect_context(&uri)?,
                };
                addrs.next().ok_or_else(|| NetError::ConnectFailed {
                    uri: uri.clone(),
                    detail: "no addresses found for host".to_string(),
                    errno: Errno::Ehostunreach,
                    cause: None,
                })?
            }
        };

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .connect_context(&uri)?;
        if let Some(bind) = options.bind_address {
            socket.bind(SocketAddr::new(bind, 0)).connect_context(&uri)?;
        }
        if options.nodelay {
            socket.set_nodelay(true).connect_context(&uri)?;
        }

        tracing::debug!(uri = %uri, addr = %addr, "opening TCP connection");
        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(NetError::cancelled(&uri, DialPhase::Connect));
            }
            res = socket.connect(addr) => res.connect_context(&uri)?,
        };

        Connection::from_tcp(stream).connect_context(&uri)
    }
}

impl Connector for TcpDialer {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        let uri = uri.to_string();
        let options = self.options.clone();
        Box::pin(Self::dial(uri, options, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_uri_without_port() {
        let dialer = TcpDialer::new();
        let err = dialer
            .connect("tcp://1.2.3.4", CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 22);
    }

    #[tokio::test]
    async fn rejects_foreign_scheme() {
        let dialer = TcpDialer::new();
        let err = dialer
            .connect("udp://1.2.3.4:80", CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 22);
    }

    #[tokio::test]
    async fn dials_a_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await });

        let dialer = TcpDialer::with_options(TcpOptions { nodelay: true, ..Default::default() });
        let conn = dialer
            .connect(&format!("tcp://{addr}"), CancellationToken::new())
            .await
            .unwrap();
        assert!(!conn.is_unix());
        assert!(!conn.is_encrypted());
        assert_eq!(conn.remote_uri(), Some(format!("tcp://{addr}")));
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancelled_before_connect_reports_econnaborted() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let dialer = TcpDialer::new();
        // Reserved TEST-NET-1 address: the connect would hang, but the
        // already-fired token must win first.
        let err = dialer
            .connect("tcp://192.0.2.1:81", cancel)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection to tcp://192.0.2.1:81 cancelled (ECONNABORTED)"
        );
        assert_eq!(err.code(), 103);
    }
}
