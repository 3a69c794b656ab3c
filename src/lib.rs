//! # netdial
//!
//! A client-side connector library for stream-oriented transports.
//!
//! `netdial` establishes TCP, TLS and Unix-domain connections behind one
//! cancellable [`Connector`] abstraction, with an RFC 8305 Happy Eyeballs
//! dialer at its core: AAAA and A lookups race in parallel, candidate
//! addresses interleave across families, and staggered transport attempts
//! keep latency low even when one address family is broken.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netdial::{Connector, SchemeConnector};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let connector = SchemeConnector::new();
//!     let conn = connector
//!         .connect("tls://example.com:443", CancellationToken::new())
//!         .await
//!         .unwrap();
//!     println!("connected to {}", conn.remote_uri().unwrap());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and the URI model
//! - [`dns`] - Pluggable per-record-type resolvers
//! - [`socket`] - Connections, transport dialers, TLS layering, listeners
//! - [`connector`] - Happy Eyeballs, scheme routing, timeouts, composition
//!
//! ## Cancellation
//!
//! Every `connect()` takes a `CancellationToken`. Cancellation propagates
//! downward and is terminal: resolver queries, pacing timers and in-flight
//! transport attempts are torn down, and the dial resolves with an
//! `ECONNABORTED` error naming the phase it was in.

pub mod base;
pub mod connector;
pub mod dns;
pub mod socket;

pub use base::neterror::{DialPhase, Errno, NetError};
pub use base::uri::ParsedUri;
pub use connector::{
    Connecting, Connector, ConnectorBuilder, DnsConnector, HappyEyeballsConnector,
    SchemeConnector, SecureConnector, TimeoutConnector,
};
pub use dns::{GaiResolver, HickoryResolver, Name, RecordType, Resolve, Resolving, StaticResolver};
pub use socket::server::{TcpListenerSocket, UnixListenerSocket};
pub use socket::stream::{Connection, Endpoint};
pub use socket::tcp::{TcpDialer, TcpOptions};
pub use socket::tls::{enable_client, enable_server, TlsOptions, TlsOptionsBuilder};
pub use socket::unix::UnixDialer;
