//! System DNS resolver using getaddrinfo.
//!
//! Uses the operating system's native resolution via `getaddrinfo`, executed
//! in a thread pool to avoid blocking the async runtime. Record-type
//! filtering is applied after the fact since `getaddrinfo` answers both
//! families at once.

use super::{Name, RecordType, Resolve, Resolving};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::net::ToSocketAddrs;

/// System DNS resolver using `getaddrinfo` in a thread pool.
///
/// Wraps the standard library's `ToSocketAddrs` and executes resolution in
/// `tokio::task::spawn_blocking`. Each resolution spawns a blocking task; for
/// high-throughput scenarios prefer the fully async `HickoryResolver`.
#[derive(Clone, Debug, Default)]
pub struct GaiResolver;

impl GaiResolver {
    /// Creates a new `GaiResolver`.
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, name: Name, record: RecordType) -> Resolving {
        Box::pin(async move {
            let host = name.as_str().to_string();
            let lookup_host = host.clone();

            let result = tokio::task::spawn_blocking(move || {
                tracing::debug!(host = %lookup_host, "resolving via getaddrinfo");
                (lookup_host.as_str(), 0u16)
                    .to_socket_addrs()
                    .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<_>>())
            })
            .await;

            let addrs = result
                .map_err(|e| {
                    tracing::error!(error = %e, "DNS resolution task failed");
                    NetError::dns_lookup_failed(&host, e.to_string())
                })?
                .dns_context(&host)
                .map_err(|e| {
                    tracing::debug!(host = %host, error = %e, "DNS resolution failed");
                    e
                })?;

            let ips: Vec<_> = addrs.into_iter().filter(|ip| record.matches(ip)).collect();
            tracing::debug!(host = %host, record = %record, count = ips.len(), "resolution complete");
            Ok(ips)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gai_resolver_localhost() {
        let resolver = GaiResolver::new();
        // localhost should resolve on any system; filter to v4 so the
        // assertion is stable across dual-stack configurations.
        let result = resolver.resolve(Name::new("localhost"), RecordType::A).await;
        if let Ok(addrs) = result {
            assert!(addrs.iter().all(|ip| ip.is_ipv4()));
        }
    }
}
