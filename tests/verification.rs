//! Tail verification tests against mock push and tail servers.

use std::sync::Arc;
use std::time::Duration;

use ingest_longtest::config::{SenderConfig, ORG_ID_HEADER};
use ingest_longtest::lifecycle::Shutdown;
use ingest_longtest::resilience::RetryPolicy;
use ingest_longtest::stats::{StatsRegistry, LOGS_RECEIVED, REQ_OK, SENT_SIZE, TAIL_LATENCY};
use ingest_longtest::verification::{
    TailError, TailReader, TailTarget, TailVerifier, VerifierSettings,
};

mod common;

fn sender(push: std::net::SocketAddr, tail: std::net::SocketAddr) -> SenderConfig {
    let mut config = SenderConfig {
        url: format!("http://{push}"),
        reader_url: format!("http://{tail}"),
        containers: vec!["c1".into()],
        lines: vec!["hello".into()],
        lines_per_tick: 5,
        ..Default::default()
    };
    config.headers.insert(ORG_ID_HEADER.into(), "3".into());
    config
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        backoff: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_reader_counts_records() {
    let tail = common::start_tail_server(2, 3, Duration::from_millis(20)).await;
    let target = Arc::new(TailTarget::from_reader_url(&format!("http://{tail}"), "").unwrap());
    let stats = Arc::new(StatsRegistry::new());
    let shutdown = Shutdown::new();
    let (fatal_tx, mut fatal_rx) = tokio::sync::mpsc::unbounded_channel();

    let reader = TailReader::new(0, target, stats.clone());
    let handle = tokio::spawn(reader.run(shutdown.subscribe(), fatal_tx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let snap = stats.collect();
    assert_eq!(snap.counter(LOGS_RECEIVED), 6);
    let latency = snap.summary(TAIL_LATENCY).unwrap();
    assert_eq!(latency.count, 6);
    assert!(latency.min >= 0.0);
    assert!(latency.max < 5.0);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(fatal_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_verifier_fans_out_and_writes() {
    let (push, captured) = common::start_mock_backend(204).await;
    let tail = common::start_tail_server(1, 2, Duration::from_millis(10)).await;
    let stats = Arc::new(StatsRegistry::new());

    let verifier = TailVerifier::new(
        sender(push, tail),
        VerifierSettings {
            readers: 4,
            settle: Duration::from_millis(100),
            ..Default::default()
        },
        policy(),
        stats.clone(),
    )
    .unwrap();

    verifier.run().await.unwrap();
    verifier.run().await.unwrap();
    assert_eq!(verifier.writer_count(), 1);
    assert_eq!(stats.collect().counter(LOGS_RECEIVED), 8);

    // The writer ticks once a second.
    tokio::time::sleep(Duration::from_millis(1300)).await;
    let snap = stats.collect();
    assert!(snap.counter(REQ_OK) >= 1);
    assert_eq!(snap.counter_for(SENT_SIZE, "writer-0"), 20 * snap.counter(REQ_OK));

    {
        let captured = captured.lock().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&captured[0].body).unwrap();
        assert_eq!(body["streams"][0]["stream"]["sender_id"], "writer-0");
        assert_eq!(body["streams"][0]["stream"]["orgid"], "3");
    }

    verifier.stop();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(verifier.active_readers(), 0);
}

#[tokio::test]
async fn test_subscription_failure_is_fatal() {
    let (push, _) = common::start_mock_backend(204).await;
    let tail = common::closed_port().await;

    let verifier = TailVerifier::new(
        sender(push, tail),
        VerifierSettings {
            readers: 2,
            settle: Duration::from_millis(10),
            ..Default::default()
        },
        policy(),
        Arc::new(StatsRegistry::new()),
    )
    .unwrap();

    verifier.run().await.unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), verifier.fatal())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(err, TailError::Subscribe { .. }));
    verifier.stop();
}
