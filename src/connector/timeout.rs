//! Deadline wrapper for connectors.

use crate::base::neterror::NetError;
use crate::connector::{Connecting, Connector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Races the inner connector against a deadline.
///
/// When the deadline fires first the pending dial is cancelled and the
/// caller gets an `ETIMEDOUT` error; otherwise the inner result passes
/// through unchanged. Caller cancellation propagates to the inner dial
/// through the token hierarchy.
pub struct TimeoutConnector {
    inner: Arc<dyn Connector>,
    timeout: Duration,
}

impl TimeoutConnector {
    pub fn new(inner: Arc<dyn Connector>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Connector for TimeoutConnector {
    fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
        let uri = uri.to_string();
        let inner = self.inner.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            let child = cancel.child_token();
            let attempt = inner.connect(&uri, child.clone());
            tokio::select! {
                biased;
                res = attempt => res,
                _ = sleep(timeout) => {
                    child.cancel();
                    tracing::debug!(uri = %uri, timeout = ?timeout, "dial timed out");
                    Err(NetError::Timeout { uri, seconds: timeout.as_secs_f64() })
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future;

    struct NeverConnector;

    impl Connector for NeverConnector {
        fn connect(&self, _uri: &str, _cancel: CancellationToken) -> Connecting {
            Box::pin(future::pending())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_produces_etimedout() {
        let connector =
            TimeoutConnector::new(Arc::new(NeverConnector), Duration::from_secs(5));
        let err = connector
            .connect("tcp://example.com:80", CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection to tcp://example.com:80 timed out after 5 seconds (ETIMEDOUT)"
        );
        assert_eq!(err.code(), 110);
    }

    #[tokio::test(start_paused = true)]
    async fn inner_cancellation_message_passes_through() {
        struct CancelAware;
        impl Connector for CancelAware {
            fn connect(&self, uri: &str, cancel: CancellationToken) -> Connecting {
                let uri = uri.to_string();
                Box::pin(async move {
                    cancel.cancelled().await;
                    Err(NetError::cancelled(
                        &uri,
                        crate::base::neterror::DialPhase::Connect,
                    ))
                })
            }
        }

        let connector = TimeoutConnector::new(Arc::new(CancelAware), Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let pending = connector.connect("tcp://example.com:80", cancel.clone());
        let handle = tokio::spawn(pending);
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection to tcp://example.com:80 cancelled (ECONNABORTED)"
        );
    }
}
