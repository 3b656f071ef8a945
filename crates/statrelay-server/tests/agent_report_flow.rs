//! End-to-end flow: agent transport client against a live collector.

use statrelay_agent::transport::ReportClient;
use statrelay_common::types::{MetricSample, MetricValue};
use statrelay_server::app;
use statrelay_server::state::AppState;
use statrelay_storage::memory::MemStorage;
use statrelay_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server(
    sign_key: Option<&str>,
) -> (String, Arc<MemStorage>, tokio::task::JoinHandle<()>) {
    let storage = Arc::new(MemStorage::new());
    let state = AppState {
        storage: storage.clone(),
        db: None,
        sign_key: sign_key.map(Arc::from),
    };
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    (format!("http://{addr}"), storage, handle)
}

#[tokio::test]
async fn agent_batches_reach_the_store() {
    let (base, storage, server) = spawn_server(None).await;
    let client = ReportClient::new(&base, Duration::from_secs(2), None).unwrap();

    let batch = vec![
        MetricSample::gauge("memory.total", 1024.0),
        MetricSample::counter("agent.poll_count", 5),
    ];
    client.send_batch(&batch).await.unwrap();
    // The agent resends its cumulative totals every cycle; the collector
    // keeps adding counters onto its own running total.
    client.send_batch(&batch).await.unwrap();

    assert_eq!(
        storage.get("memory.total").await.unwrap(),
        MetricValue::Gauge(1024.0)
    );
    assert_eq!(
        storage.get("agent.poll_count").await.unwrap(),
        MetricValue::Counter(10)
    );
    server.abort();
}

#[tokio::test]
async fn signed_batches_verify_end_to_end() {
    let (base, storage, server) = spawn_server(Some("relay-secret")).await;
    let client = ReportClient::new(
        &base,
        Duration::from_secs(2),
        Some("relay-secret".to_string()),
    )
    .unwrap();

    client
        .send_batch(&[MetricSample::gauge("cpu.usage", 12.5)])
        .await
        .unwrap();
    assert_eq!(
        storage.get("cpu.usage").await.unwrap(),
        MetricValue::Gauge(12.5)
    );
    server.abort();
}

#[tokio::test]
async fn mismatched_key_rejects_the_whole_batch() {
    let (base, storage, server) = spawn_server(Some("server-key")).await;
    let client = ReportClient::new(
        &base,
        Duration::from_secs(2),
        Some("agent-key".to_string()),
    )
    .unwrap();

    let err = client
        .send_batch(&[MetricSample::gauge("cpu.usage", 12.5)])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("400"));
    assert!(storage.get("cpu.usage").await.is_err());
    server.abort();
}
