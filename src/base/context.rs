//! Ergonomic error context helpers.
//!
//! Extension traits that convert IO errors into context-rich [`NetError`]
//! values carrying the URI of the dial that failed.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding dial context to IO Results.
pub trait IoResultExt<T> {
    /// Classify an IO error as a transport failure for `uri`.
    ///
    /// # Example
    /// ```ignore
    /// use netdial::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await.connect_context("tcp://1.2.3.4:80")?;
    /// // Error: "Connection to tcp://1.2.3.4:80 failed: Connection refused (ECONNREFUSED)"
    /// ```
    fn connect_context(self, uri: &str) -> Result<T, NetError>;

    /// Classify an IO error as a resolver failure for `host`.
    fn dns_context(self, host: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connect_context(self, uri: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::connect_failed(uri, &e))
    }

    fn dns_context(self, host: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_lookup_failed(host, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::neterror::Errno;
    use std::io::{Error, ErrorKind};

    #[test]
    fn connect_context_classifies_errno() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::TimedOut, "timed out"));
        let err = result.connect_context("tcp://10.0.0.1:443").unwrap_err();
        assert_eq!(err.errno(), Some(Errno::Etimedout));
        assert_eq!(
            err.to_string(),
            "Connection to tcp://10.0.0.1:443 failed: Connection timed out (ETIMEDOUT)"
        );
    }

    #[test]
    fn dns_context_carries_host() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.com").unwrap_err();
        match err {
            NetError::DnsLookupFailed { host, .. } => assert_eq!(host, "unknown.example.com"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
