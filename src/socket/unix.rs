//! Unix-domain transport dialer.

use crate::base::context::IoResultExt;
use crate::base::neterror::{DialPhase, NetError};
use crate::base::uri::ParsedUri;
use crate::connector::{Connecting, Connector};
use crate::socket::stream::Connection;
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

/// Dials one Unix-domain socket per `connect()` call.
///
/// Accepts `unix://<path>` URIs; a missing scheme defaults to `unix`.
#[derive(Debug, Clone, Default)]
pub struct UnixDialer;

impl UnixDialer {
    pub fn new() -> Self {
        Self
    }

    async fn dial(uri: String, cancel: CancellationToken) -> Result<Connection, NetError> {
        let parsed = ParsedUri::parse(&uri, "unix")?;
        if parsed.scheme() != "unix" {
            return Err(NetError::invalid_uri(&uri));
        }
        let path = parsed.path().to_string();

        tracing::debug!(uri = %uri, "opening Unix connection");
        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(NetError::cancelled(&uri, DialPhase::Connect));
            }
            res = UnixStream::connect(&path) => res.connect_context(&uri)?,
        };

        Connection::from_unix(stream).connect_context(&uri)
    }
}

impl Connector for UnixDialer {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        Box::pin(Self::dial(uri.to_string(), cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_foreign_scheme() {
        let err = UnixDialer::new()
            .connect("tcp://1.2.3.4:80", CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 22);
    }

    #[tokio::test]
    async fn dials_a_local_socket() {
        let dir = std::env::temp_dir().join(format!("netdial-unix-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dial.sock");
        let _ = std::fs::remove_file(&path);
        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        let accept = tokio::spawn(async move { listener.accept().await });

        let conn = UnixDialer::new()
            .connect(&format!("unix://{}", path.display()), CancellationToken::new())
            .await
            .unwrap();
        assert!(conn.is_unix());
        assert!(!conn.is_encrypted());
        assert_eq!(
            conn.remote_uri(),
            Some(format!("unix://{}", path.display()))
        );
        accept.await.unwrap().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_socket_reports_connect_failure() {
        let err = UnixDialer::new()
            .connect("unix:///nonexistent/netdial.sock", CancellationToken::new())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with("Connection to unix:///nonexistent/netdial.sock failed: "),
            "unexpected message: {message}"
        );
    }
}
