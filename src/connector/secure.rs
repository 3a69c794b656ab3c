//! TLS-establishing connector.
//!
//! Accepts `tls://host:port` destinations, dials the inner transport with
//! the scheme stripped, then upgrades the result with a TLS client
//! handshake. Inner failures are re-reported under the caller's `tls://`
//! URI with the original error kept as the cause.

use crate::base::neterror::NetError;
use crate::base::uri::ParsedUri;
use crate::connector::{Connecting, Connector};
use crate::socket::stream::Connection;
use crate::socket::tls::{self, TlsOptions};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Composes a transport connector with the TLS wrapper.
pub struct SecureConnector {
    inner: Arc<dyn Connector>,
    options: TlsOptions,
}

impl SecureConnector {
    pub fn new(inner: Arc<dyn Connector>, options: TlsOptions) -> Self {
        Self { inner, options }
    }

    async fn dial(
        uri: String,
        inner: Arc<dyn Connector>,
        mut options: TlsOptions,
        cancel: CancellationToken,
    ) -> Result<Connection, NetError> {
        let uri = if uri.contains("://") { uri } else { format!("tls://{uri}") };
        let parsed = ParsedUri::parse(&uri, "tls")?;
        if parsed.scheme() != "tls" || parsed.host().is_none() || parsed.port().is_none() {
            return Err(NetError::invalid_uri(&uri));
        }

        // The inner transport sees the bare authority; it prefixes its own
        // default scheme.
        let inner_uri = uri.replacen("tls://", "", 1);
        let conn = match inner.connect(&inner_uri, cancel.child_token()).await {
            Ok(conn) => conn,
            Err(err) => return Err(err.with_uri(&uri)),
        };

        if !conn.has_stream() {
            let mut conn = conn;
            let _ = conn.close().await;
            return Err(NetError::Unexpected {
                message: "base connector returned a connection without an underlying stream"
                    .to_string(),
            });
        }

        if options.sni_hostname.is_none() {
            // An explicit hostname= hint wins over the URI host; both come
            // into play when the inner dial replaced the host with an IP.
            options.sni_hostname = parsed.hostname_hint();
        }

        tls::enable_client(conn, &uri, &options, cancel.child_token()).await
    }
}

impl Connector for SecureConnector {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        let uri = uri.to_string();
        let inner = self.inner.clone();
        let options = self.options.clone();
        Box::pin(Self::dial(uri, inner, options, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingInner {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Connector for RecordingInner {
        fn connect(&self, uri: &str, _cancel: CancellationToken) -> Connecting {
            self.seen.lock().unwrap().push(uri.to_string());
            let uri = uri.to_string();
            Box::pin(async move {
                Err(NetError::connect_failed(
                    &format!("tcp://{uri}"),
                    &std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                ))
            })
        }
    }

    #[tokio::test]
    async fn strips_scheme_and_rewraps_inner_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let connector = SecureConnector::new(
            Arc::new(RecordingInner { seen: seen.clone() }),
            TlsOptions::default(),
        );

        let err = connector
            .connect("tls://example.com:443", CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().as_slice(), ["example.com:443"]);
        assert_eq!(
            err.to_string(),
            "Connection to tls://example.com:443 failed: Connection refused (ECONNREFUSED)"
        );
        assert_eq!(err.code(), 111);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn prefixes_default_scheme() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let connector = SecureConnector::new(
            Arc::new(RecordingInner { seen: seen.clone() }),
            TlsOptions::default(),
        );
        let _ = connector
            .connect("example.com:443", CancellationToken::new())
            .await;
        assert_eq!(seen.lock().unwrap().as_slice(), ["example.com:443"]);
    }

    #[tokio::test]
    async fn rejects_uri_without_port() {
        let connector = SecureConnector::new(
            Arc::new(RecordingInner { seen: Arc::new(Mutex::new(Vec::new())) }),
            TlsOptions::default(),
        );
        let err = connector
            .connect("tls://example.com", CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 22);
    }
}
