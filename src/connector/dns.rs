//! Plain resolve-then-dial connector.
//!
//! The non-racing alternative to Happy Eyeballs: resolve the host once
//! (both families, IPv6 first), then walk the candidates sequentially until
//! one connects. Used by router configurations with `happy_eyeballs` off.

use crate::base::neterror::{DialPhase, Errno, NetError};
use crate::base::uri::ParsedUri;
use crate::connector::{Connecting, Connector};
use crate::dns::{Name, RecordType, Resolve};
use crate::socket::stream::Connection;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves hostnames and dials candidates one at a time.
///
/// Literal-IP destinations skip resolution; the caller's URI is forwarded
/// verbatim. Candidate URIs carry the `hostname=` hint exactly like the
/// Happy Eyeballs dialer's.
pub struct DnsConnector {
    dialer: Arc<dyn Connector>,
    resolver: Arc<dyn Resolve>,
}

impl DnsConnector {
    pub fn new(dialer: Arc<dyn Connector>, resolver: Arc<dyn Resolve>) -> Self {
        Self { dialer, resolver }
    }

    async fn resolve_family(
        resolver: &Arc<dyn Resolve>,
        host: &str,
        record: RecordType,
        uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, NetError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NetError::cancelled(uri, DialPhase::DnsLookup)),
            res = resolver.resolve(Name::new(host), record) => res,
        }
    }

    async fn dial(
        uri: String,
        dialer: Arc<dyn Connector>,
        resolver: Arc<dyn Resolve>,
        cancel: CancellationToken,
    ) -> Result<Connection, NetError> {
        let parsed = ParsedUri::parse(&uri, "tcp")?;
        let host = match parsed.host() {
            Some(host) => host.to_string(),
            None => return Err(NetError::invalid_uri(&uri)),
        };
        if parsed.port().is_none() {
            return Err(NetError::invalid_uri(&uri));
        }
        if parsed.ip_literal().is_some() {
            return dialer.connect(&uri, cancel).await;
        }

        let mut candidates: Vec<IpAddr> = Vec::new();
        let mut dns_error: Option<NetError> = None;
        for record in [RecordType::Aaaa, RecordType::A] {
            match Self::resolve_family(&resolver, &host, record, &uri, &cancel).await {
                Ok(ips) => candidates.extend(ips),
                Err(err @ NetError::Cancelled { .. }) => return Err(err),
                Err(err) => dns_error = Some(err),
            }
        }

        if candidates.is_empty() {
            let (detail, cause) = match dns_error {
                Some(err) => {
                    let detail = match &err {
                        NetError::DnsLookupFailed { detail, .. } => detail.clone(),
                        other => other.to_string(),
                    };
                    (detail, Some(Arc::new(err)))
                }
                None => ("no IP addresses returned for host".to_string(), None),
            };
            return Err(NetError::AggregateFailed {
                uri,
                phase: DialPhase::DnsLookup,
                detail,
                errno: Errno::Ehostunreach,
                cause,
            });
        }

        let mut last_error: Option<NetError> = None;
        for ip in candidates {
            let attempt_uri = parsed.candidate_uri(&ip, &host);
            tracing::debug!(uri = %uri, attempt = %attempt_uri, "dialing candidate");
            match dialer.connect(&attempt_uri, cancel.child_token()).await {
                Ok(conn) => return Ok(conn),
                Err(NetError::Cancelled { .. }) => {
                    return Err(NetError::cancelled(&uri, DialPhase::Connect));
                }
                Err(err) => last_error = Some(err),
            }
        }

        // Every candidate failed; surface the last failure under the
        // caller's URI with the candidate error as cause.
        let last = last_error.expect("at least one candidate was dialed");
        Err(last.with_uri(&uri))
    }
}

impl Connector for DnsConnector {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        let uri = uri.to_string();
        let dialer = self.dialer.clone();
        let resolver = self.resolver.clone();
        Box::pin(Self::dial(uri, dialer, resolver, cancel))
    }
}
