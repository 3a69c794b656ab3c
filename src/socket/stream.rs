//! Connection and endpoint types.
//!
//! A [`Connection`] is a live bidirectional byte stream plus its transport
//! metadata: remote/local endpoints, whether it is Unix-domain, and whether
//! it is TLS-encrypted. Endpoint queries on a closed connection answer
//! `None` rather than failing.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpStream, UnixStream};
use tokio_boring::SslStream;

/// A transport-layer destination: IP+port or Unix path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Endpoint {
    /// Renders the endpoint as a URI. Encrypted TCP endpoints report
    /// `tls://`, plaintext ones `tcp://`; Unix endpoints always `unix://`.
    pub fn uri(&self, encrypted: bool) -> String {
        match self {
            Endpoint::Tcp(addr) => {
                let scheme = if encrypted { "tls" } else { "tcp" };
                format!("{scheme}://{addr}")
            }
            Endpoint::Unix(path) => format!("unix://{}", path.display()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => fmt::Display::fmt(addr, f),
            Endpoint::Unix(path) => fmt::Display::fmt(&path.display(), f),
        }
    }
}

/// The concrete socket behind a [`Connection`].
#[derive(Debug)]
pub enum StreamKind {
    Tcp(TcpStream),
    Unix(UnixStream),
    TlsTcp(SslStream<TcpStream>),
    TlsUnix(SslStream<UnixStream>),
}

impl StreamKind {
    fn is_unix(&self) -> bool {
        matches!(self, StreamKind::Unix(_) | StreamKind::TlsUnix(_))
    }

    fn is_encrypted(&self) -> bool {
        matches!(self, StreamKind::TlsTcp(_) | StreamKind::TlsUnix(_))
    }
}

impl AsyncRead for StreamKind {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            StreamKind::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            StreamKind::Unix(s) => Pin::new(s).poll_read(cx, buf),
            StreamKind::TlsTcp(s) => Pin::new(s).poll_read(cx, buf),
            StreamKind::TlsUnix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for StreamKind {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            StreamKind::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            StreamKind::Unix(s) => Pin::new(s).poll_write(cx, buf),
            StreamKind::TlsTcp(s) => Pin::new(s).poll_write(cx, buf),
            StreamKind::TlsUnix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            StreamKind::Tcp(s) => Pin::new(s).poll_flush(cx),
            StreamKind::Unix(s) => Pin::new(s).poll_flush(cx),
            StreamKind::TlsTcp(s) => Pin::new(s).poll_flush(cx),
            StreamKind::TlsUnix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            StreamKind::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            StreamKind::Unix(s) => Pin::new(s).poll_shutdown(cx),
            StreamKind::TlsTcp(s) => Pin::new(s).poll_shutdown(cx),
            StreamKind::TlsUnix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// A live bidirectional byte stream with transport metadata.
///
/// Owned by its opener until closed. Endpoint accessors return `None` once
/// the connection has been closed (or its stream taken for a TLS upgrade).
#[derive(Debug)]
pub struct Connection {
    stream: Option<StreamKind>,
    remote: Option<Endpoint>,
    local: Option<Endpoint>,
    unix: bool,
    encrypted: bool,
}

impl Connection {
    /// Wraps an established TCP stream, capturing both endpoints.
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        let remote = Endpoint::Tcp(stream.peer_addr()?);
        let local = Endpoint::Tcp(stream.local_addr()?);
        Ok(Self {
            stream: Some(StreamKind::Tcp(stream)),
            remote: Some(remote),
            local: Some(local),
            unix: false,
            encrypted: false,
        })
    }

    /// Wraps an established Unix-domain stream.
    pub fn from_unix(stream: UnixStream) -> io::Result<Self> {
        let remote = stream
            .peer_addr()?
            .as_pathname()
            .map(|p| Endpoint::Unix(p.to_path_buf()));
        let local = stream
            .local_addr()?
            .as_pathname()
            .map(|p| Endpoint::Unix(p.to_path_buf()));
        Ok(Self {
            stream: Some(StreamKind::Unix(stream)),
            remote,
            local,
            unix: true,
            encrypted: false,
        })
    }

    /// Reassembles a connection around an upgraded stream, carrying the
    /// endpoints over from before the upgrade.
    pub(crate) fn from_parts(
        stream: StreamKind,
        remote: Option<Endpoint>,
        local: Option<Endpoint>,
    ) -> Self {
        let unix = stream.is_unix();
        let encrypted = stream.is_encrypted();
        Self { stream: Some(stream), remote, local, unix, encrypted }
    }

    /// The remote endpoint, or `None` after close.
    pub fn remote_endpoint(&self) -> Option<&Endpoint> {
        if self.stream.is_some() {
            self.remote.as_ref()
        } else {
            None
        }
    }

    /// The local endpoint, or `None` after close.
    pub fn local_endpoint(&self) -> Option<&Endpoint> {
        if self.stream.is_some() {
            self.local.as_ref()
        } else {
            None
        }
    }

    /// The remote endpoint rendered as a URI (`tls://` when encrypted).
    pub fn remote_uri(&self) -> Option<String> {
        self.remote_endpoint().map(|e| e.uri(self.encrypted))
    }

    /// The local endpoint rendered as a URI (`tls://` when encrypted).
    pub fn local_uri(&self) -> Option<String> {
        self.local_endpoint().map(|e| e.uri(self.encrypted))
    }

    pub fn is_unix(&self) -> bool {
        self.unix
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Whether the connection still owns its stream.
    pub(crate) fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Takes the stream out for a TLS upgrade, leaving the connection
    /// closed from the caller's point of view.
    pub(crate) fn take_stream(&mut self) -> Option<StreamKind> {
        self.stream.take()
    }

    /// The endpoints as captured at open time, regardless of close state.
    pub(crate) fn endpoints(&self) -> (Option<Endpoint>, Option<Endpoint>) {
        (self.remote.clone(), self.local.clone())
    }

    /// Gracefully shuts the stream down and releases it. Endpoint queries
    /// answer `None` afterwards. Closing twice is a no-op.
    pub async fn close(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => {
                let result = stream.shutdown().await;
                self.stream = None;
                result
            }
            None => Ok(()),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_read(cx, buf),
            None => Poll::Ready(Err(io::ErrorKind::NotConnected.into())),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_write(cx, buf),
            None => Poll::Ready(Err(io::ErrorKind::NotConnected.into())),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_flush(cx),
            None => Poll::Ready(Err(io::ErrorKind::NotConnected.into())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn endpoint_uri_schemes() {
        let v4 = Endpoint::Tcp(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 80));
        assert_eq!(v4.uri(false), "tcp://1.2.3.4:80");
        assert_eq!(v4.uri(true), "tls://1.2.3.4:80");

        let v6 = Endpoint::Tcp(SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 443));
        assert_eq!(v6.uri(false), "tcp://[::1]:443");

        let unix = Endpoint::Unix(PathBuf::from("/tmp/app.sock"));
        assert_eq!(unix.uri(false), "unix:///tmp/app.sock");
        assert_eq!(unix.uri(true), "unix:///tmp/app.sock");
    }

    #[tokio::test]
    async fn endpoints_are_none_after_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::from_tcp(stream).unwrap();
        assert!(conn.remote_endpoint().is_some());
        assert!(conn.local_endpoint().is_some());
        assert_eq!(conn.remote_uri(), Some(format!("tcp://{addr}")));

        conn.close().await.unwrap();
        assert!(conn.remote_endpoint().is_none());
        assert!(conn.local_endpoint().is_none());
        assert!(conn.remote_uri().is_none());

        // closing again is a no-op
        conn.close().await.unwrap();
        drop(accept);
    }
}
