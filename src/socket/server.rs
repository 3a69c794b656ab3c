//! Server-side listeners.
//!
//! Thin listeners over `tokio::net::{TcpListener, UnixListener}` that hand
//! out [`Connection`]s and support pausing: a paused listener parks pending
//! `accept` calls until resumed. Pausing an idle or already-paused listener
//! and resuming a running one are no-ops. TLS server sockets are expressed
//! by composing `accept()` with [`crate::socket::tls::enable_server`].

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::base::uri::ParsedUri;
use crate::socket::stream::{Connection, Endpoint};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::watch;

/// A TCP listener producing [`Connection`]s.
#[derive(Debug)]
pub struct TcpListenerSocket {
    inner: TcpListener,
    paused: watch::Sender<bool>,
}

impl TcpListenerSocket {
    /// Binds to `uri` (`tcp://ip:port`, scheme optional; port may be 0).
    pub async fn bind(uri: &str) -> Result<Self, NetError> {
        let parsed = ParsedUri::parse(uri, "tcp")?;
        let ip = parsed.ip_literal().ok_or_else(|| NetError::invalid_uri(uri))?;
        let port = parsed.port().ok_or_else(|| NetError::invalid_uri(uri))?;
        let inner = TcpListener::bind(SocketAddr::new(ip, port))
            .await
            .connect_context(uri)?;
        tracing::debug!(uri = %uri, local = ?inner.local_addr().ok(), "TCP listener bound");
        Ok(Self { inner, paused: watch::Sender::new(false) })
    }

    /// The bound address.
    pub fn local_endpoint(&self) -> Option<Endpoint> {
        self.inner.local_addr().ok().map(Endpoint::Tcp)
    }

    /// Stops handing out connections until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Resumes a paused listener.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Accepts the next connection; parks while the listener is paused.
    pub async fn accept(&self) -> Result<Connection, NetError> {
        let uri = self
            .local_endpoint()
            .map(|e| e.uri(false))
            .unwrap_or_else(|| "tcp://".to_string());
        let mut paused = self.paused.subscribe();
        loop {
            if *paused.borrow() {
                let _ = paused.changed().await;
                continue;
            }
            tokio::select! {
                res = self.inner.accept() => {
                    let (stream, _) = res.connect_context(&uri)?;
                    return Connection::from_tcp(stream).connect_context(&uri);
                }
                _ = paused.changed() => continue,
            }
        }
    }
}

/// A Unix-domain listener producing [`Connection`]s.
#[derive(Debug)]
pub struct UnixListenerSocket {
    inner: UnixListener,
    path: PathBuf,
    paused: watch::Sender<bool>,
}

impl UnixListenerSocket {
    /// Binds to `uri` (`unix://<path>`, scheme optional).
    pub fn bind(uri: &str) -> Result<Self, NetError> {
        let parsed = ParsedUri::parse(uri, "unix")?;
        if parsed.scheme() != "unix" {
            return Err(NetError::invalid_uri(uri));
        }
        let path = PathBuf::from(parsed.path());
        let inner = UnixListener::bind(&path).connect_context(uri)?;
        tracing::debug!(uri = %uri, "Unix listener bound");
        Ok(Self { inner, path, paused: watch::Sender::new(false) })
    }

    pub fn local_endpoint(&self) -> Endpoint {
        Endpoint::Unix(self.path.clone())
    }

    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Accepts the next connection; parks while the listener is paused.
    pub async fn accept(&self) -> Result<Connection, NetError> {
        let uri = self.local_endpoint().uri(false);
        let mut paused = self.paused.subscribe();
        loop {
            if *paused.borrow() {
                let _ = paused.changed().await;
                continue;
            }
            tokio::select! {
                res = self.inner.accept() => {
                    let (stream, _) = res.connect_context(&uri)?;
                    return Connection::from_unix(stream).connect_context(&uri);
                }
                _ = paused.changed() => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_resume_is_idempotent() {
        // State-only check: repeated transitions settle on the same state.
        let (tx, _rx) = watch::channel(false);
        tx.send_replace(true);
        tx.send_replace(true);
        assert!(*tx.borrow());
        tx.send_replace(false);
        tx.send_replace(false);
        assert!(!*tx.borrow());
    }

    #[tokio::test]
    async fn bind_reports_local_endpoint() {
        let listener = TcpListenerSocket::bind("tcp://127.0.0.1:0").await.unwrap();
        match listener.local_endpoint() {
            Some(Endpoint::Tcp(addr)) => assert_ne!(addr.port(), 0),
            other => panic!("unexpected endpoint: {other:?}"),
        }
    }
}
