//! Scheme-dispatching top-level connector.
//!
//! Routes a destination URI to a per-scheme sub-connector. The default
//! build wires `tcp` (Happy Eyeballs over the TCP dialer), `tls` (the same
//! stack under the secure connector) and `unix`; callers can disable any
//! of them, swap the resolver, register extra schemes, or wrap everything
//! with a connect timeout.

use crate::base::neterror::NetError;
use crate::connector::{
    Connecting, Connector, DnsConnector, HappyEyeballsConnector, SecureConnector,
    TimeoutConnector,
};
use crate::dns::{HickoryResolver, Resolve};
use crate::socket::tcp::{TcpDialer, TcpOptions};
use crate::socket::tls::TlsOptions;
use crate::socket::unix::UnixDialer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A per-scheme configuration slot: configured, or switched off entirely.
#[derive(Debug, Clone)]
pub enum SchemeOption<T> {
    Enabled(T),
    Disabled,
}

impl<T: Default> Default for SchemeOption<T> {
    fn default() -> Self {
        SchemeOption::Enabled(T::default())
    }
}

/// How hostnames are resolved for the TCP/TLS schemes.
#[derive(Clone, Default)]
pub enum DnsMode {
    /// Shared hickory-dns resolver.
    #[default]
    System,
    /// Caller-supplied resolver.
    Custom(Arc<dyn Resolve>),
    /// No resolution; hostnames pass through to the OS at connect time.
    Disabled,
}

/// Builder for [`SchemeConnector`].
#[must_use]
#[derive(Default)]
pub struct ConnectorBuilder {
    tcp: SchemeOption<TcpOptions>,
    tls: SchemeOption<TlsOptions>,
    unix: SchemeOption<()>,
    dns: DnsMode,
    timeout: Option<Duration>,
    happy_eyeballs: Option<bool>,
    extra: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tcp_options(mut self, options: TcpOptions) -> Self {
        self.tcp = SchemeOption::Enabled(options);
        self
    }

    pub fn disable_tcp(mut self) -> Self {
        self.tcp = SchemeOption::Disabled;
        self
    }

    pub fn tls_options(mut self, options: TlsOptions) -> Self {
        self.tls = SchemeOption::Enabled(options);
        self
    }

    pub fn disable_tls(mut self) -> Self {
        self.tls = SchemeOption::Disabled;
        self
    }

    pub fn disable_unix(mut self) -> Self {
        self.unix = SchemeOption::Disabled;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.dns = DnsMode::Custom(resolver);
        self
    }

    pub fn disable_dns(mut self) -> Self {
        self.dns = DnsMode::Disabled;
        self
    }

    /// Wrap every sub-connector with a connect deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Choose between Happy Eyeballs (default) and sequential dialing.
    pub fn happy_eyeballs(mut self, enabled: bool) -> Self {
        self.happy_eyeballs = Some(enabled);
        self
    }

    /// Register a connector for an additional scheme.
    pub fn scheme(mut self, scheme: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        self.extra.insert(scheme.into(), connector);
        self
    }

    pub fn build(self) -> SchemeConnector {
        let mut connectors: HashMap<String, Arc<dyn Connector>> = self.extra;

        let tcp_wanted = matches!(self.tcp, SchemeOption::Enabled(_));
        let tls_wanted = matches!(self.tls, SchemeOption::Enabled(_));
        if tcp_wanted || tls_wanted {
            let tcp_options = match self.tcp {
                SchemeOption::Enabled(options) => options,
                SchemeOption::Disabled => TcpOptions::default(),
            };
            let dialer: Arc<dyn Connector> = Arc::new(TcpDialer::with_options(tcp_options));
            let tcp_stack: Arc<dyn Connector> = match self.dns {
                DnsMode::Disabled => dialer,
                mode => {
                    let resolver: Arc<dyn Resolve> = match mode {
                        DnsMode::System => Arc::new(HickoryResolver::new()),
                        DnsMode::Custom(resolver) => resolver,
                        DnsMode::Disabled => unreachable!(),
                    };
                    if self.happy_eyeballs.unwrap_or(true) {
                        Arc::new(HappyEyeballsConnector::new(dialer, resolver))
                    } else {
                        Arc::new(DnsConnector::new(dialer, resolver))
                    }
                }
            };
            if tcp_wanted {
                connectors.insert("tcp".to_string(), tcp_stack.clone());
            }
            if let SchemeOption::Enabled(tls_options) = self.tls {
                connectors.insert(
                    "tls".to_string(),
                    Arc::new(SecureConnector::new(tcp_stack, tls_options)),
                );
            }
        }
        if matches!(self.unix, SchemeOption::Enabled(())) {
            connectors.insert("unix".to_string(), Arc::new(UnixDialer::new()));
        }

        if let Some(timeout) = self.timeout {
            for connector in connectors.values_mut() {
                *connector = Arc::new(TimeoutConnector::new(connector.clone(), timeout));
            }
        }

        SchemeConnector { connectors }
    }
}

/// Top-level connector dispatching on the URI scheme.
///
/// A missing scheme defaults to `tcp`. Unknown or disabled schemes fail
/// with EINVAL.
pub struct SchemeConnector {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl SchemeConnector {
    /// The default stack: Happy Eyeballs TCP, TLS and Unix transports.
    pub fn new() -> Self {
        ConnectorBuilder::new().build()
    }

    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::new()
    }
}

impl Default for SchemeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SchemeConnector {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        let scheme = match uri.split_once("://") {
            Some((scheme, _)) => scheme.to_ascii_lowercase(),
            None => "tcp".to_string(),
        };
        match self.connectors.get(&scheme) {
            Some(connector) => connector.connect(uri, cancel),
            None => {
                let err = NetError::invalid_argument(format!(
                    "No connector available for URI scheme \"{scheme}\""
                ));
                Box::pin(std::future::ready(Err(err)))
            }
        }
    }
}
