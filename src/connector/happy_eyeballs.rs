//! Happy Eyeballs dialing (RFC 8305 / RFC 6555).
//!
//! Given a hostname, races IPv6 and IPv4: both address families are
//! resolved in parallel, candidates are interleaved into one queue, and
//! transport attempts start staggered so a healthy family wins quickly
//! while a broken one only costs the stagger delay. The first attempt to
//! connect wins; everything else is torn down.

use crate::base::neterror::{DialPhase, Errno, NetError};
use crate::base::uri::ParsedUri;
use crate::connector::{Connecting, Connector};
use crate::dns::{Name, RecordType, Resolve};
use crate::socket::stream::Connection;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;

/// Minimum interval between launching two new connection attempts.
pub const ATTEMPT_DELAY: Duration = Duration::from_millis(100);

/// Maximum time an A answer is held back to give AAAA a chance to arrive.
pub const RESOLUTION_DELAY: Duration = Duration::from_millis(50);

/// Hostname-dialing connector implementing Happy Eyeballs.
///
/// Literal-IP destinations skip resolution entirely: the caller's URI goes
/// to the transport dialer verbatim. Hostnames run the staggered dual-stack
/// dial, handing the transport dialer one candidate URI per attempt with a
/// `hostname=` hint appended for downstream TLS verification.
pub struct HappyEyeballsConnector {
    dialer: Arc<dyn Connector>,
    resolver: Arc<dyn Resolve>,
}

impl HappyEyeballsConnector {
    pub fn new(dialer: Arc<dyn Connector>, resolver: Arc<dyn Resolve>) -> Self {
        Self { dialer, resolver }
    }
}

impl Connector for HappyEyeballsConnector {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        let uri = uri.to_string();
        let dialer = self.dialer.clone();
        let resolver = self.resolver.clone();
        Box::pin(async move {
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
            EyeballDial::new(uri, host, parsed, dialer, resolver).run(cancel).await
        })
    }
}

type EventFuture = BoxFuture<'static, Event>;

enum Event {
    Dns(RecordType, Result<Vec<IpAddr>, NetError>),
    Attempt(IpAddr, Result<Connection, NetError>),
}

/// Per-dial state: DNS progress, the candidate queue, pacing, and the
/// per-family error trail used to compose the aggregate failure.
struct EyeballDial {
    uri: String,
    host: String,
    parts: ParsedUri,
    dialer: Arc<dyn Connector>,
    resolver: Arc<dyn Resolve>,
    queue: VecDeque<IpAddr>,
    resolved_v4: bool,
    resolved_v6: bool,
    deferred_v4: Vec<IpAddr>,
    ips_seen: usize,
    failures: usize,
    attempts_started: usize,
    last_error_v4: Option<String>,
    last_error_v6: Option<String>,
    last_error_record: Option<RecordType>,
    last_errno: Option<Errno>,
    last_cause: Option<Arc<NetError>>,
}

impl EyeballDial {
    fn new(
        uri: String,
        host: String,
        parts: ParsedUri,
        dialer: Arc<dyn Connector>,
        resolver: Arc<dyn Resolve>,
    ) -> Self {
        Self {
            uri,
            host,
            parts,
            dialer,
            resolver,
            queue: VecDeque::new(),
            resolved_v4: false,
            resolved_v6: false,
            deferred_v4: Vec::new(),
            ips_seen: 0,
            failures: 0,
            attempts_started: 0,
            last_error_v4: None,
            last_error_v6: None,
            last_error_record: None,
            last_errno: None,
            last_cause: None,
        }
    }

    async fn run(mut self, cancel: CancellationToken) -> Result<Connection, NetError> {
        let mut events: FuturesUnordered<EventFuture> = FuturesUnordered::new();
        for record in [RecordType::Aaaa, RecordType::A] {
            let resolver = self.resolver.clone();
            let name = Name::new(self.host.clone());
            events.push(Box::pin(async move {
                Event::Dns(record, resolver.resolve(name, record).await)
            }));
        }

        // Timers live outside the state struct so the select can poll them
        // while handlers mutate the rest of the state.
        let mut attempt_timer: Option<Pin<Box<Sleep>>> = None;
        let mut resolution_timer: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let phase = if self.attempts_started == 0 {
                        DialPhase::DnsLookup
                    } else {
                        DialPhase::Connect
                    };
                    tracing::debug!(uri = %self.uri, "dial cancelled");
                    return Err(NetError::cancelled(&self.uri, phase));
                }
                Some(event) = events.next() => match event {
                    Event::Dns(record, result) => {
                        self.mark_resolved(record);
                        match result {
                            Ok(ips) => {
                                if record == RecordType::A && !self.resolved_v6 && !ips.is_empty() {
                                    // The A answer must not race ahead of AAAA.
                                    self.deferred_v4 = ips;
                                    resolution_timer = Some(Box::pin(sleep(RESOLUTION_DELAY)));
                                } else {
                                    self.enqueue(record, ips, &mut events, &mut attempt_timer, &cancel);
                                }
                            }
                            Err(err) => {
                                tracing::debug!(uri = %self.uri, record = %record, error = %err, "resolver query failed");
                                self.record_failure(record, err);
                            }
                        }
                        if record == RecordType::Aaaa && !self.deferred_v4.is_empty() {
                            resolution_timer = None;
                            let ips = std::mem::take(&mut self.deferred_v4);
                            self.enqueue(RecordType::A, ips, &mut events, &mut attempt_timer, &cancel);
                        }
                    }
                    Event::Attempt(ip, Ok(conn)) => {
                        tracing::debug!(uri = %self.uri, ip = %ip, "connection established");
                        // Dropping the remaining event futures and timers
                        // cancels every loser and pending resolver query.
                        return Ok(conn);
                    }
                    Event::Attempt(ip, Err(err)) => {
                        self.failures += 1;
                        let record = if ip.is_ipv6() { RecordType::Aaaa } else { RecordType::A };
                        tracing::debug!(uri = %self.uri, ip = %ip, error = %err, "connection attempt failed");
                        self.record_failure(record, err);
                        if !self.queue.is_empty() {
                            // The next attempt starts immediately; pacing
                            // restarts from this point.
                            attempt_timer = None;
                            self.start_attempt(&mut events, &mut attempt_timer, &cancel);
                        }
                    }
                },
                _ = async { resolution_timer.as_mut().unwrap().await }, if resolution_timer.is_some() => {
                    resolution_timer = None;
                    let ips = std::mem::take(&mut self.deferred_v4);
                    self.enqueue(RecordType::A, ips, &mut events, &mut attempt_timer, &cancel);
                }
                _ = async { attempt_timer.as_mut().unwrap().await }, if attempt_timer.is_some() => {
                    attempt_timer = None;
                    if !self.queue.is_empty() {
                        self.start_attempt(&mut events, &mut attempt_timer, &cancel);
                    } else if self.dns_pending() {
                        attempt_timer = Some(Box::pin(sleep(ATTEMPT_DELAY)));
                    }
                }
            }

            if let Some(err) = self.exhausted() {
                return Err(err);
            }
        }
    }

    fn mark_resolved(&mut self, record: RecordType) {
        match record {
            RecordType::A => self.resolved_v4 = true,
            RecordType::Aaaa => self.resolved_v6 = true,
        }
    }

    /// DNS counts as in flight until both answers have arrived *and* any
    /// held-back A answer has been released into the queue.
    fn dns_pending(&self) -> bool {
        !(self.resolved_v4 && self.resolved_v6) || !self.deferred_v4.is_empty()
    }

    fn enqueue(
        &mut self,
        record: RecordType,
        ips: Vec<IpAddr>,
        events: &mut FuturesUnordered<EventFuture>,
        attempt_timer: &mut Option<Pin<Box<Sleep>>>,
        cancel: &CancellationToken,
    ) {
        if ips.is_empty() {
            return;
        }
        self.ips_seen += ips.len();
        self.mix_into_queue(ips);
        tracing::debug!(uri = %self.uri, record = %record, queued = self.queue.len(), "candidate addresses queued");
        if attempt_timer.is_none() {
            self.start_attempt(events, attempt_timer, cancel);
        }
    }

    /// Interleave rule: shuffle the arriving batch, then alternate between
    /// new and already-queued addresses so the queue alternates families
    /// when both are present.
    fn mix_into_queue(&mut self, mut batch: Vec<IpAddr>) {
        batch.shuffle(&mut rand::thread_rng());
        let stash: VecDeque<IpAddr> = std::mem::take(&mut self.queue);
        let mut fresh = batch.into_iter();
        let mut queued = stash.into_iter();
        loop {
            let next_fresh = fresh.next();
            let next_queued = queued.next();
            if next_fresh.is_none() && next_queued.is_none() {
                break;
            }
            if let Some(ip) = next_fresh {
                self.queue.push_back(ip);
            }
            if let Some(ip) = next_queued {
                self.queue.push_back(ip);
            }
        }
    }

    fn start_attempt(
        &mut self,
        events: &mut FuturesUnordered<EventFuture>,
        attempt_timer: &mut Option<Pin<Box<Sleep>>>,
        cancel: &CancellationToken,
    ) {
        let Some(ip) = self.queue.pop_front() else {
            return;
        };
        let attempt_uri = self.parts.candidate_uri(&ip, &self.host);
        tracing::debug!(uri = %self.uri, attempt = %attempt_uri, "starting connection attempt");
        self.attempts_started += 1;
        let dialer = self.dialer.clone();
        let token = cancel.child_token();
        events.push(Box::pin(async move {
            Event::Attempt(ip, dialer.connect(&attempt_uri, token).await)
        }));
        if attempt_timer.is_none() && (!self.queue.is_empty() || self.dns_pending()) {
            *attempt_timer = Some(Box::pin(sleep(ATTEMPT_DELAY)));
        }
    }

    fn record_failure(&mut self, record: RecordType, err: NetError) {
        let text = match &err {
            NetError::DnsLookupFailed { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        match record {
            RecordType::A => self.last_error_v4 = Some(text),
            RecordType::Aaaa => self.last_error_v6 = Some(text),
        }
        self.last_error_record = Some(record);
        if let Some(errno) = err.errno() {
            self.last_errno = Some(errno);
        }
        self.last_cause = Some(Arc::new(err));
    }

    /// Exhausted failure: both resolver queries have terminated and every
    /// address that ever surfaced has failed (or none surfaced at all).
    fn exhausted(&mut self) -> Option<NetError> {
        if self.dns_pending() {
            return None;
        }
        if self.ips_seen == 0 {
            return Some(self.aggregate_error(DialPhase::DnsLookup));
        }
        if self.failures == self.ips_seen {
            return Some(self.aggregate_error(DialPhase::Connect));
        }
        None
    }

    fn aggregate_error(&mut self, phase: DialPhase) -> NetError {
        let detail = match (&self.last_error_v4, &self.last_error_v6) {
            (Some(v4), Some(v6)) if v4 == v6 => v4.clone(),
            (Some(v4), Some(v6)) => match self.last_error_record {
                Some(RecordType::Aaaa) => {
                    format!("Last error for IPv6: {v6}. Previous error for IPv4: {v4}")
                }
                _ => format!("Last error for IPv4: {v4}. Previous error for IPv6: {v6}"),
            },
            (Some(v4), None) => v4.clone(),
            (None, Some(v6)) => v6.clone(),
            (None, None) => "no IP addresses returned for host".to_string(),
        };
        NetError::AggregateFailed {
            uri: self.uri.clone(),
            phase,
            detail,
            errno: self.last_errno.unwrap_or(Errno::Ehostunreach),
            cause: self.last_cause.take(),
        }
    }
}
