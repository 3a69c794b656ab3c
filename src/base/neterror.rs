use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Symbolic OS error constants used throughout the connector stack.
///
/// The numeric values are the documented Linux constants; they are fixed
/// rather than read from libc so that error codes stay stable across targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Errno {
    Einval,
    Econnaborted,
    Econnrefused,
    Econnreset,
    Enetunreach,
    Ehostunreach,
    Etimedout,
    Eaddrnotavail,
    Eaddrinuse,
    Eacces,
    Epipe,
    Eio,
}

impl Errno {
    /// The numeric error code.
    pub const fn code(self) -> i32 {
        match self {
            Errno::Einval => 22,
            Errno::Econnaborted => 103,
            Errno::Econnrefused => 111,
            Errno::Econnreset => 104,
            Errno::Enetunreach => 101,
            Errno::Ehostunreach => 113,
            Errno::Etimedout => 110,
            Errno::Eaddrnotavail => 99,
            Errno::Eaddrinuse => 98,
            Errno::Eacces => 13,
            Errno::Epipe => 32,
            Errno::Eio => 5,
        }
    }

    /// The symbolic name, as it appears inside error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Errno::Einval => "EINVAL",
            Errno::Econnaborted => "ECONNABORTED",
            Errno::Econnrefused => "ECONNREFUSED",
            Errno::Econnreset => "ECONNRESET",
            Errno::Enetunreach => "ENETUNREACH",
            Errno::Ehostunreach => "EHOSTUNREACH",
            Errno::Etimedout => "ETIMEDOUT",
            Errno::Eaddrnotavail => "EADDRNOTAVAIL",
            Errno::Eaddrinuse => "EADDRINUSE",
            Errno::Eacces => "EACCES",
            Errno::Epipe => "EPIPE",
            Errno::Eio => "EIO",
        }
    }

    /// Human-readable detail used in the `failed: <detail> (<CODE>)` shape.
    pub const fn describe(self) -> &'static str {
        match self {
            Errno::Einval => "Invalid argument",
            Errno::Econnaborted => "Connection aborted",
            Errno::Econnrefused => "Connection refused",
            Errno::Econnreset => "Connection reset by peer",
            Errno::Enetunreach => "Network unreachable",
            Errno::Ehostunreach => "No route to host",
            Errno::Etimedout => "Connection timed out",
            Errno::Eaddrnotavail => "Cannot assign requested address",
            Errno::Eaddrinuse => "Address already in use",
            Errno::Eacces => "Permission denied",
            Errno::Epipe => "Broken pipe",
            Errno::Eio => "Input/output error",
        }
    }

    /// Classify an IO error into the closest errno.
    pub fn from_io(err: &io::Error) -> Errno {
        use io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionRefused => Errno::Econnrefused,
            ErrorKind::ConnectionReset => Errno::Econnreset,
            ErrorKind::ConnectionAborted => Errno::Econnaborted,
            ErrorKind::TimedOut => Errno::Etimedout,
            ErrorKind::AddrNotAvailable => Errno::Eaddrnotavail,
            ErrorKind::AddrInUse => Errno::Eaddrinuse,
            ErrorKind::PermissionDenied => Errno::Eacces,
            ErrorKind::BrokenPipe => Errno::Epipe,
            ErrorKind::InvalidInput => Errno::Einval,
            ErrorKind::NetworkUnreachable => Errno::Enetunreach,
            ErrorKind::HostUnreachable => Errno::Ehostunreach,
            _ => match err.raw_os_error() {
                Some(101) => Errno::Enetunreach,
                Some(110) => Errno::Etimedout,
                Some(113) => Errno::Ehostunreach,
                _ => Errno::Eio,
            },
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The phase a dial was in when it was cancelled or gave up.
///
/// Rendered as a message infix so the `Connection to <uri>
/// cancelled/failed[ during <phase>]` shapes stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialPhase {
    /// A transport attempt was in progress (or about to be).
    Connect,
    /// No transport attempt had been issued yet.
    DnsLookup,
    /// The transport was connected and the TLS handshake was in progress.
    TlsHandshake,
}

impl fmt::Display for DialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialPhase::Connect => Ok(()),
            DialPhase::DnsLookup => f.write_str(" during DNS lookup"),
            DialPhase::TlsHandshake => f.write_str(" during TLS handshake"),
        }
    }
}

/// Errors produced by connectors, transport dialers and the TLS wrapper.
///
/// Every variant maps to an OS-style integer code through [`NetError::code`].
/// Wrapping layers keep the prior error reachable through `source()`.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    /// Malformed URI, or an unknown/disabled scheme.
    #[error("{message} (EINVAL)")]
    InvalidArgument { message: String },

    /// A transport-level connection attempt failed.
    #[error("Connection to {uri} failed: {detail} ({errno})")]
    ConnectFailed {
        uri: String,
        detail: String,
        errno: Errno,
        #[source]
        cause: Option<Arc<NetError>>,
    },

    /// The caller cancelled the dial.
    #[error("Connection to {uri} cancelled{phase} (ECONNABORTED)")]
    Cancelled { uri: String, phase: DialPhase },

    /// A hostname dial exhausted every candidate, or never produced any.
    #[error("Connection to {uri} failed{phase}: {detail}")]
    AggregateFailed {
        uri: String,
        phase: DialPhase,
        detail: String,
        errno: Errno,
        #[source]
        cause: Option<Arc<NetError>>,
    },

    /// The TLS handshake failed after the transport connected.
    #[error("Connection to {uri} failed during TLS handshake: {detail}")]
    TlsHandshakeFailed {
        uri: String,
        detail: String,
        errno: Errno,
        #[source]
        cause: Option<Arc<NetError>>,
    },

    /// A resolver rejected the query. `detail` carries the resolver's raw
    /// message; aggregate composition uses it unprefixed.
    #[error("DNS lookup for {host} failed: {detail}")]
    DnsLookupFailed { host: String, detail: String },

    /// The deadline of a timeout wrapper elapsed first.
    #[error("Connection to {uri} timed out after {seconds} seconds (ETIMEDOUT)")]
    Timeout { uri: String, seconds: f64 },

    /// A collaborator broke the connector contract.
    #[error("{message}")]
    Unexpected { message: String },
}

impl NetError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        NetError::InvalidArgument { message: message.into() }
    }

    pub fn invalid_uri(uri: &str) -> Self {
        NetError::InvalidArgument { message: format!("Given URI \"{uri}\" is invalid") }
    }

    /// Transport failure classified from an IO error.
    pub fn connect_failed(uri: &str, err: &io::Error) -> Self {
        let errno = Errno::from_io(err);
        let detail = match errno {
            Errno::Eio => err.to_string(),
            known => known.describe().to_string(),
        };
        NetError::ConnectFailed { uri: uri.to_string(), detail, errno, cause: None }
    }

    pub fn cancelled(uri: &str, phase: DialPhase) -> Self {
        NetError::Cancelled { uri: uri.to_string(), phase }
    }

    pub fn dns_lookup_failed(host: &str, detail: impl Into<String>) -> Self {
        NetError::DnsLookupFailed { host: host.to_string(), detail: detail.into() }
    }

    /// The integer error code for this error; `0` when no errno applies.
    pub fn code(&self) -> i32 {
        self.errno().map(Errno::code).unwrap_or(0)
    }

    /// The errno class, if the variant carries one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            NetError::InvalidArgument { .. } => Some(Errno::Einval),
            NetError::ConnectFailed { errno, .. } => Some(*errno),
            NetError::Cancelled { .. } => Some(Errno::Econnaborted),
            NetError::AggregateFailed { errno, .. } => Some(*errno),
            NetError::TlsHandshakeFailed { errno, .. } => Some(*errno),
            NetError::DnsLookupFailed { .. } => Some(Errno::Ehostunreach),
            NetError::Timeout { .. } => Some(Errno::Etimedout),
            NetError::Unexpected { .. } => None,
        }
    }

    /// Rewrap this error under a different URI, preserving the code and
    /// chaining the original as the cause. Used by layers whose caller-facing
    /// URI differs from the one the failing layer saw.
    pub fn with_uri(self, uri: &str) -> NetError {
        let uri = uri.to_string();
        match &self {
            NetError::Cancelled { phase, .. } => NetError::Cancelled { uri, phase: *phase },
            NetError::Timeout { seconds, .. } => NetError::Timeout { uri, seconds: *seconds },
            NetError::ConnectFailed { detail, errno, .. } => {
                let (detail, errno) = (detail.clone(), *errno);
                NetError::ConnectFailed { uri, detail, errno, cause: Some(Arc::new(self)) }
            }
            NetError::AggregateFailed { detail, phase, errno, .. } => {
                let (detail, phase, errno) = (detail.clone(), *phase, *errno);
                NetError::AggregateFailed { uri, phase, detail, errno, cause: Some(Arc::new(self)) }
            }
            NetError::TlsHandshakeFailed { detail, errno, .. } => {
                let (detail, errno) = (detail.clone(), *errno);
                NetError::TlsHandshakeFailed { uri, detail, errno, cause: Some(Arc::new(self)) }
            }
            NetError::InvalidArgument { .. }
            | NetError::DnsLookupFailed { .. }
            | NetError::Unexpected { .. } => self,
        }
    }
}
