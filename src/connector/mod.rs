//! Connector composition.
//!
//! Everything that can establish a [`Connection`] from a URI string
//! implements [`Connector`]. Connectors nest: the scheme router dispatches
//! to per-scheme connectors, the secure connector wraps a transport
//! connector with TLS, the timeout connector wraps anything with a
//! deadline, and the Happy Eyeballs connector turns hostnames into raced
//! per-IP transport dials.

use crate::base::neterror::NetError;
use crate::socket::stream::Connection;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

mod dns;
mod happy_eyeballs;
mod router;
mod secure;
mod timeout;

pub use dns::DnsConnector;
pub use happy_eyeballs::HappyEyeballsConnector;
pub use router::{ConnectorBuilder, DnsMode, SchemeConnector, SchemeOption};
pub use secure::SecureConnector;
pub use timeout::TimeoutConnector;

/// Alias for the `Future` type returned by a connector.
pub type Connecting = Pin<Box<dyn Future<Output = Result<Connection, NetError>> + Send>>;

/// Trait for establishing stream connections from URI strings.
///
/// Cancellation is cooperative: when `cancel` fires, the pending dial is
/// torn down and the future resolves with an `ECONNABORTED` error naming
/// the phase it was in. Dropping the returned future is equally terminal —
/// all descendants (timers, resolver queries, in-flight attempts) are owned
/// by it, never detached.
pub trait Connector: Send + Sync {
    /// Connects to the destination described by `uri`.
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting;
}

/// Blanket implementation for Arc-wrapped connectors.
impl<C: Connector + ?Sized> Connector for Arc<C> {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        (**self).connect(uri, cancel)
    }
}
