//! Connector composition tests.
//!
//! Exercises the scheme router end to end against local listeners, the
//! sequential DNS connector, the timeout wrapper and the pausable
//! listeners.

use netdial::{
    Connector, Endpoint, NetError, SchemeConnector, StaticResolver, TcpListenerSocket,
    UnixListenerSocket,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn static_resolver(entries: &[(&str, &[&str])]) -> Arc<StaticResolver> {
    let mut table = HashMap::new();
    for (host, ips) in entries {
        let ips: Vec<IpAddr> = ips.iter().map(|ip| ip.parse().unwrap()).collect();
        table.insert(host.to_string(), ips);
    }
    Arc::new(StaticResolver::new(table))
}

async fn echo_listener() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let mut buf = [0u8; 256];
                while let Ok(n) = stream.read(&mut buf).await {
                    if n == 0 || stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

#[tokio::test]
async fn router_resolves_and_connects_through_the_full_stack() {
    let addr = echo_listener().await;
    let connector = SchemeConnector::builder()
        .resolver(static_resolver(&[("local.test", &["127.0.0.1"])]))
        .build();

    let mut conn = connector
        .connect(&format!("tcp://local.test:{}", addr.port()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(conn.remote_uri(), Some(format!("tcp://{addr}")));
    conn.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
    conn.close().await.unwrap();
    assert!(conn.remote_endpoint().is_none());
}

#[tokio::test]
async fn router_literal_ip_needs_no_resolver() {
    let addr = echo_listener().await;
    // An empty resolver table: any hostname lookup would fail loudly.
    let connector = SchemeConnector::builder().resolver(static_resolver(&[])).build();

    let conn = connector
        .connect(&format!("tcp://{addr}"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(conn.remote_uri(), Some(format!("tcp://{addr}")));
}

#[tokio::test]
async fn sequential_connector_walks_candidates_in_order() {
    let addr = echo_listener().await;
    // First candidate points at a dead loopback address, second at the
    // listener; the sequential dialer must fall through.
    let connector = SchemeConnector::builder()
        .happy_eyeballs(false)
        .resolver(static_resolver(&[("multi.test", &["127.0.0.2", "127.0.0.1"])]))
        .build();

    let conn = connector
        .connect(&format!("tcp://multi.test:{}", addr.port()), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(conn.remote_uri(), Some(format!("tcp://{addr}")));
}

#[tokio::test]
async fn sequential_connector_reports_dns_failure_under_caller_uri() {
    let connector = SchemeConnector::builder()
        .happy_eyeballs(false)
        .resolver(static_resolver(&[]))
        .build();

    let err = connector
        .connect("tcp://missing.test:80", CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Connection to tcp://missing.test:80 failed during DNS lookup: no static entry for host"
    );
    assert_eq!(err.code(), 113);
}

#[tokio::test(start_paused = true)]
async fn router_timeout_wraps_extra_schemes() {
    struct NeverConnector;
    impl Connector for NeverConnector {
        fn connect(&self, _uri: &str, _cancel: CancellationToken) -> netdial::Connecting {
            Box::pin(futures::future::pending())
        }
    }

    let connector = SchemeConnector::builder()
        .scheme("slow", Arc::new(NeverConnector))
        .timeout(Duration::from_secs(3))
        .build();

    let err = connector
        .connect("slow://example.com:1", CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Connection to slow://example.com:1 timed out after 3 seconds (ETIMEDOUT)"
    );
    assert_eq!(err.code(), 110);
}

#[tokio::test]
async fn connection_refused_message_shape() {
    // Bind then drop to find a port that refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = SchemeConnector::builder().resolver(static_resolver(&[])).build();
    let err = connector
        .connect(&format!("tcp://{addr}"), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Connection to tcp://{addr} failed: Connection refused (ECONNREFUSED)")
    );
    assert_eq!(err.code(), 111);
}

#[tokio::test]
async fn listener_pause_parks_accept_until_resume() {
    let listener = Arc::new(TcpListenerSocket::bind("tcp://127.0.0.1:0").await.unwrap());
    let Some(Endpoint::Tcp(addr)) = listener.local_endpoint() else {
        panic!("listener must report a TCP endpoint");
    };

    listener.pause();
    listener.pause(); // pausing twice is a no-op
    assert!(listener.is_paused());

    let accepting = {
        let listener = listener.clone();
        tokio::spawn(async move { listener.accept().await })
    };

    // The client handshake completes against the backlog, but accept must
    // stay parked while paused.
    let _client = tokio::net::TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!accepting.is_finished());

    listener.resume();
    listener.resume(); // resuming twice is a no-op
    let conn = accepting.await.unwrap().unwrap();
    assert!(!conn.is_unix());
    assert!(conn.remote_endpoint().is_some());
}

#[tokio::test]
async fn unix_listener_and_dialer_round_trip() {
    let dir = std::env::temp_dir().join(format!("netdial-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("roundtrip.sock");
    let _ = std::fs::remove_file(&path);

    let listener = UnixListenerSocket::bind(&format!("unix://{}", path.display())).unwrap();
    assert_eq!(listener.local_endpoint(), Endpoint::Unix(path.clone()));

    let server = tokio::spawn(async move {
        let mut conn = listener.accept().await.unwrap();
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await.unwrap();
        conn.write_all(&buf).await.unwrap();
        buf
    });

    let connector = SchemeConnector::new();
    let mut conn = connector
        .connect(&format!("unix://{}", path.display()), CancellationToken::new())
        .await
        .unwrap();
    assert!(conn.is_unix());
    assert_eq!(conn.remote_uri(), Some(format!("unix://{}", path.display())));

    conn.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");
    assert_eq!(&server.await.unwrap(), b"hello");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn invalid_uris_are_rejected_before_dialing() {
    let connector = SchemeConnector::new();
    for uri in ["tcp://", "tcp://example.com"] {
        let err = connector.connect(uri, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, NetError::InvalidArgument { .. }), "{uri} must be EINVAL");
        assert_eq!(err.code(), 22);
    }
}
