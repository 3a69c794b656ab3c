//! Async DNS resolver using hickory-dns.
//!
//! Fully async resolution with system configuration auto-detection and
//! per-record-type queries, which the Happy Eyeballs dialer needs to race
//! AAAA and A answers independently.

use super::{Name, RecordType, Resolve, Resolving};
use crate::base::neterror::NetError;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{
    config::ResolverConfig, name_server::TokioConnectionProvider, ResolveError, ResolveErrorKind,
    TokioResolver,
};
use std::{net::IpAddr, sync::LazyLock};

/// Async DNS resolver backed by hickory-dns.
///
/// The underlying resolver is lazily initialized on first use and shared
/// across all instances. It configures itself from the system's DNS settings
/// and falls back to defaults when those cannot be read.
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    resolver: &'static LazyLock<TokioResolver>,
}

impl HickoryResolver {
    /// Creates a new `HickoryResolver`.
    pub fn new() -> Self {
        static RESOLVER: LazyLock<TokioResolver> = LazyLock::new(|| {
            let builder = match TokioResolver::builder_tokio() {
                Ok(builder) => {
                    tracing::debug!("Using system DNS configuration");
                    builder
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Failed to read system DNS config, using defaults"
                    );
                    TokioResolver::builder_with_config(
                        ResolverConfig::default(),
                        TokioConnectionProvider::default(),
                    )
                }
            };
            builder.build()
        });

        Self { resolver: &RESOLVER }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// A name that exists but has no records of the queried type is an empty
/// answer, not a failure.
fn is_no_records(err: &ResolveError) -> bool {
    match err.kind() {
        ResolveErrorKind::Proto(proto) => {
            matches!(proto.kind(), ProtoErrorKind::NoRecordsFound { .. })
        }
        _ => false,
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, name: Name, record: RecordType) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            tracing::debug!(host = %host, record = %record, "resolving via hickory-dns");

            let ips: Vec<IpAddr> = match record {
                RecordType::A => match resolver.resolver.ipv4_lookup(host.as_str()).await {
                    Ok(lookup) => lookup.iter().map(|a| IpAddr::V4(a.0)).collect(),
                    Err(e) if is_no_records(&e) => Vec::new(),
                    Err(e) => return Err(NetError::dns_lookup_failed(&host, e.to_string())),
                },
                RecordType::Aaaa => match resolver.resolver.ipv6_lookup(host.as_str()).await {
                    Ok(lookup) => lookup.iter().map(|aaaa| IpAddr::V6(aaaa.0)).collect(),
                    Err(e) if is_no_records(&e) => Vec::new(),
                    Err(e) => return Err(NetError::dns_lookup_failed(&host, e.to_string())),
                },
            };

            tracing::debug!(host = %host, record = %record, count = ips.len(), "resolution complete");
            Ok(ips)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hickory_resolver_is_shared() {
        let r1 = HickoryResolver::new();
        let r2 = r1.clone();
        assert!(std::ptr::eq(r1.resolver, r2.resolver));
    }
}
