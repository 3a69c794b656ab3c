//! TLS layering over established transports.
//!
//! Upgrades a plaintext [`Connection`] to TLS, client- or server-side. The
//! handshake is raced against a cancellation token; tearing the pending
//! handshake down closes the underlying transport. A successful upgrade
//! keeps the connection open and flips `is_encrypted`.

use crate::base::neterror::{DialPhase, Errno, NetError};
use crate::socket::stream::{Connection, StreamKind};
use boring::error::ErrorStack;
use boring::ssl::{SslAcceptor, SslConnector, SslConnectorBuilder, SslMethod, SslVerifyMode, SslVersion};
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;

/// TLS client configuration applied at handshake time.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// Hostname for SNI and certificate verification. Usually supplied by
    /// the connector pipeline from the URI's `hostname=` hint.
    pub sni_hostname: Option<String>,
    /// Verify the peer certificate chain.
    pub verify_peer: bool,
    /// ALPN protocols to offer, in preference order.
    pub alpn_protocols: Vec<String>,
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub cipher_list: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            sni_hostname: None,
            verify_peer: true,
            alpn_protocols: Vec::new(),
            min_version: Some(SslVersion::TLS1_2),
            max_version: None,
            cipher_list: None,
        }
    }
}

impl TlsOptions {
    pub fn builder() -> TlsOptionsBuilder {
        TlsOptionsBuilder::default()
    }

    /// Apply this configuration to an SSL connector builder.
    pub(crate) fn apply_to_connector(
        &self,
        builder: &mut SslConnectorBuilder,
    ) -> Result<(), ErrorStack> {
        builder.set_min_proto_version(self.min_version)?;
        builder.set_max_proto_version(self.max_version)?;
        if let Some(ciphers) = &self.cipher_list {
            builder.set_cipher_list(ciphers)?;
        }
        if !self.alpn_protocols.is_empty() {
            let mut wire = Vec::new();
            for proto in &self.alpn_protocols {
                wire.push(proto.len() as u8);
                wire.extend_from_slice(proto.as_bytes());
            }
            builder.set_alpn_protos(&wire)?;
        }
        builder.set_verify(if self.verify_peer {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });
        Ok(())
    }
}

/// Builder for [`TlsOptions`].
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct TlsOptionsBuilder {
    options: TlsOptions,
}

impl TlsOptionsBuilder {
    pub fn sni_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.options.sni_hostname = Some(hostname.into());
        self
    }

    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.options.verify_peer = verify;
        self
    }

    pub fn alpn_protocols(mut self, protocols: Vec<String>) -> Self {
        self.options.alpn_protocols = protocols;
        self
    }

    pub fn min_version(mut self, version: SslVersion) -> Self {
        self.options.min_version = Some(version);
        self
    }

    pub fn max_version(mut self, version: SslVersion) -> Self {
        self.options.max_version = Some(version);
        self
    }

    pub fn cipher_list(mut self, ciphers: impl Into<String>) -> Self {
        self.options.cipher_list = Some(ciphers.into());
        self
    }

    pub fn build(self) -> TlsOptions {
        self.options
    }
}

/// Per RFC 6066, SNI must not be sent for raw IP addresses.
fn should_set_sni(host: &str) -> bool {
    !host.is_empty() && host.parse::<IpAddr>().is_err()
}

fn setup_failed(uri: &str, err: &ErrorStack) -> NetError {
    NetError::TlsHandshakeFailed {
        uri: uri.to_string(),
        detail: err.to_string(),
        errno: Errno::Eio,
        cause: None,
    }
}

/// Upgrades a plaintext connection to TLS as the client side.
///
/// On any failure the transport is torn down; on success the returned
/// connection keeps the original endpoints and reports `tls://`.
pub async fn enable_client(
    mut conn: Connection,
    uri: &str,
    options: &TlsOptions,
    cancel: CancellationToken,
) -> Result<Connection, NetError> {
    let (remote, local) = conn.endpoints();
    let Some(stream) = conn.take_stream() else {
        return Err(NetError::Unexpected {
            message: "base connector returned a connection without an underlying stream"
                .to_string(),
        });
    };

    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| setup_failed(uri, &e))?;
    options
        .apply_to_connector(&mut builder)
        .map_err(|e| setup_failed(uri, &e))?;
    let connector = builder.build();
    let mut config = connector.configure().map_err(|e| setup_failed(uri, &e))?;

    let domain = options.sni_hostname.clone().unwrap_or_default();
    if !should_set_sni(&domain) {
        config.set_use_server_name_indication(false);
        config.set_verify_hostname(false);
    }
    if !options.verify_peer {
        config.set_verify_hostname(false);
    }

    tracing::debug!(uri = %uri, sni = %domain, "starting TLS client handshake");
    let upgraded = match stream {
        StreamKind::Tcp(tcp) => {
            let stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(NetError::cancelled(uri, DialPhase::TlsHandshake));
                }
                res = tokio_boring::connect(config, &domain, tcp) => {
                    res.map_err(|e| handshake_failed(uri, e.to_string()))?
                }
            };
            StreamKind::TlsTcp(stream)
        }
        StreamKind::Unix(unix) => {
            let stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(NetError::cancelled(uri, DialPhase::TlsHandshake));
                }
                res = tokio_boring::connect(config, &domain, unix) => {
                    res.map_err(|e| handshake_failed(uri, e.to_string()))?
                }
            };
            StreamKind::TlsUnix(stream)
        }
        StreamKind::TlsTcp(_) | StreamKind::TlsUnix(_) => {
            return Err(NetError::invalid_argument(format!(
                "Connection to {uri} is already encrypted"
            )));
        }
    };

    Ok(Connection::from_parts(upgraded, remote, local))
}

/// Upgrades an accepted plaintext connection to TLS as the server side.
pub async fn enable_server(
    mut conn: Connection,
    uri: &str,
    acceptor: &SslAcceptor,
    cancel: CancellationToken,
) -> Result<Connection, NetError> {
    let (remote, local) = conn.endpoints();
    let Some(stream) = conn.take_stream() else {
        return Err(NetError::Unexpected {
            message: "base connector returned a connection without an underlying stream"
                .to_string(),
        });
    };

    tracing::debug!(uri = %uri, "starting TLS server handshake");
    let upgraded = match stream {
        StreamKind::Tcp(tcp) => {
            let stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(NetError::cancelled(uri, DialPhase::TlsHandshake));
                }
                res = tokio_boring::accept(acceptor, tcp) => {
                    res.map_err(|e| handshake_failed(uri, e.to_string()))?
                }
            };
            StreamKind::TlsTcp(stream)
        }
        StreamKind::Unix(unix) => {
            let stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(NetError::cancelled(uri, DialPhase::TlsHandshake));
                }
                res = tokio_boring::accept(acceptor, unix) => {
                    res.map_err(|e| handshake_failed(uri, e.to_string()))?
                }
            };
            StreamKind::TlsUnix(stream)
        }
        StreamKind::TlsTcp(_) | StreamKind::TlsUnix(_) => {
            return Err(NetError::invalid_argument(format!(
                "Connection to {uri} is already encrypted"
            )));
        }
    };

    Ok(Connection::from_parts(upgraded, remote, local))
}

fn handshake_failed(uri: &str, detail: String) -> NetError {
    NetError::TlsHandshakeFailed {
        uri: uri.to_string(),
        detail,
        errno: Errno::Eio,
        cause: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sni_is_suppressed_for_ip_literals() {
        assert!(should_set_sni("example.com"));
        assert!(!should_set_sni("1.2.3.4"));
        assert!(!should_set_sni("2001:db8::1"));
        assert!(!should_set_sni(""));
    }

    #[test]
    fn options_apply_to_builder() {
        let options = TlsOptions::builder()
            .alpn_protocols(vec!["h2".to_string(), "http/1.1".to_string()])
            .min_version(SslVersion::TLS1_2)
            .verify_peer(false)
            .build();
        let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
        options.apply_to_connector(&mut builder).unwrap();
    }
}
