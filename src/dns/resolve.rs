//! Core DNS resolution types and traits.
//!
//! Defines the `Resolve` trait the dialers depend on: a hostname plus a
//! record type resolves to a list of IP addresses. Resolution per record
//! type is what lets the Happy Eyeballs dialer race AAAA and A answers
//! independently.

use crate::base::neterror::NetError;
use std::{collections::HashMap, fmt, future::Future, net::IpAddr, pin::Pin, sync::Arc};

/// A domain name to resolve into IP addresses.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// The address-record type of a DNS query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address records.
    A,
    /// IPv6 address records.
    Aaaa,
}

impl RecordType {
    /// Whether an address belongs to this record type's family.
    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Aaaa => f.write_str("AAAA"),
        }
    }
}

/// Alias for the `Future` type returned by a DNS resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Vec<IpAddr>, NetError>> + Send>>;

/// Trait for DNS resolution.
///
/// An empty answer is not an error; resolver failures surface as `Err`.
/// The returned future is cancelled by dropping it.
pub trait Resolve: Send + Sync {
    /// Resolves a domain name to the addresses of one record type.
    fn resolve(&self, name: Name, record: RecordType) -> Resolving;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name, record: RecordType) -> Resolving {
        (**self).resolve(name, record)
    }
}

/// Resolver with a fixed hostname-to-address table and fallthrough.
///
/// Hostnames present in the table resolve from it (filtered by record type);
/// everything else falls through to the inner resolver. Useful for local
/// development and tests.
pub struct StaticResolver {
    inner: Option<Arc<dyn Resolve>>,
    table: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    /// A resolver that only knows the given table; unknown hostnames fail.
    pub fn new(table: HashMap<String, Vec<IpAddr>>) -> Self {
        Self { inner: None, table }
    }

    /// A resolver that consults the table first, then the inner resolver.
    pub fn with_fallthrough(inner: Arc<dyn Resolve>, table: HashMap<String, Vec<IpAddr>>) -> Self {
        Self { inner: Some(inner), table }
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, name: Name, record: RecordType) -> Resolving {
        if let Some(addrs) = self.table.get(name.as_str()) {
            let addrs: Vec<IpAddr> =
                addrs.iter().copied().filter(|ip| record.matches(ip)).collect();
            return Box::pin(std::future::ready(Ok(addrs)));
        }
        match &self.inner {
            Some(inner) => inner.resolve(name, record),
            None => {
                let host = name.as_str().to_string();
                Box::pin(async move {
                    Err(NetError::dns_lookup_failed(&host, "no static entry for host"))
                })
            }
        }
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolver")
            .field("entries", &self.table.len())
            .field("fallthrough", &self.inner.is_some())
            .finish()
    }
}
