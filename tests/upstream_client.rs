//! Upstream client tests against mock gateways.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

use particle_proxy::blockchain::{BlockchainError, ChainId, UpstreamClient};
use particle_proxy::config::UpstreamConfig;

mod common;

fn client(gateway: SocketAddr, chain_id: u64) -> UpstreamClient {
    UpstreamClient::builder()
        .credential(common::credential())
        .chain_id(ChainId(chain_id))
        .config(UpstreamConfig {
            base_url: format!("http://{}/evm-chain", gateway),
            request_timeout_secs: 5,
            max_connections: 2,
            ..Default::default()
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_call_sends_authenticated_envelope() {
    let gateway: SocketAddr = "127.0.0.1:28701".parse().unwrap();
    let recorder = common::start_echo_gateway(gateway).await;

    let client = client(gateway, 42161);
    let response = client
        .call("eth_getBalance", &[json!("0x0000000000000000000000000000000000000000"), json!("latest")])
        .await
        .unwrap();
    assert_eq!(response["result"]["chainId"], 42161);

    let requests = recorder.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.header("authorization"), Some(common::EXPECTED_AUTH));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(
        request.body,
        json!({
            "jsonrpc": "2.0",
            "chainId": 42161,
            "method": "eth_getBalance",
            "params": ["0x0000000000000000000000000000000000000000", "latest"],
            "id": 1,
        })
    );
}

#[tokio::test]
async fn test_non_success_status_is_upstream_http_error() {
    let gateway: SocketAddr = "127.0.0.1:28711".parse().unwrap();
    common::start_fixed_gateway(gateway, 503, "busy").await;

    let err = client(gateway, 1).call("eth_blockNumber", &[]).await.unwrap_err();
    match err {
        BlockchainError::UpstreamHttp { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "busy");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_gateway_is_unavailable() {
    let gateway: SocketAddr = "127.0.0.1:28721".parse().unwrap();
    let err = client(gateway, 1).call("eth_blockNumber", &[]).await.unwrap_err();
    assert!(matches!(err, BlockchainError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn test_non_json_success_is_invalid_response() {
    let gateway: SocketAddr = "127.0.0.1:28731".parse().unwrap();
    common::start_fixed_gateway(gateway, 200, "<html>oops</html>").await;

    let err = client(gateway, 1).call("eth_blockNumber", &[]).await.unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_probe_reads_remote_chain_id() {
    let gateway: SocketAddr = "127.0.0.1:28741".parse().unwrap();
    common::start_echo_gateway(gateway).await;

    let client = client(gateway, 8453);
    assert_eq!(client.remote_chain_id().await.unwrap(), ChainId(8453));
    assert!(client.verify_chain_id().await.is_ok());
}

#[tokio::test]
async fn test_probe_reports_mismatch() {
    let gateway: SocketAddr = "127.0.0.1:28751".parse().unwrap();
    common::start_fixed_gateway(gateway, 200, r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#).await;

    let err = client(gateway, 137).verify_chain_id().await.unwrap_err();
    assert!(matches!(
        err,
        BlockchainError::ChainMismatch { expected: ChainId(137), actual: ChainId(1) }
    ));
}

#[tokio::test]
async fn test_excess_calls_queue_instead_of_failing() {
    let gateway: SocketAddr = "127.0.0.1:28761".parse().unwrap();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (inf, pk) = (in_flight.clone(), peak.clone());
    common::start_programmable_gateway(gateway, move |_: Value| {
        let (inf, pk) = (inf.clone(), pk.clone());
        async move {
            let now = inf.fetch_add(1, Ordering::SeqCst) + 1;
            pk.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            inf.fetch_sub(1, Ordering::SeqCst);
            (200, r#"{"jsonrpc":"2.0","id":1,"result":"0x0"}"#.to_string())
        }
    })
    .await;

    // Pool capped at 2 in-flight calls.
    let client = Arc::new(client(gateway, 1));
    let calls: Vec<_> = (0..6)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.call("eth_blockNumber", &[]).await })
        })
        .collect();

    for call in calls {
        assert!(call.await.unwrap().is_ok());
    }
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_forward_returns_gateway_bytes_unchanged() {
    let gateway: SocketAddr = "127.0.0.1:28771".parse().unwrap();
    let upstream = r#"{"jsonrpc":"2.0", "id":1, "result":{"n":18446744073709551616,"e":2.5E-3,"s":"\u0041"}}"#;
    common::start_fixed_gateway(gateway, 200, upstream).await;

    let body = client(gateway, 1).forward("eth_call", &[]).await.unwrap();
    assert_eq!(body, upstream.as_bytes());
}

#[tokio::test]
async fn test_forward_rejects_non_json_success() {
    let gateway: SocketAddr = "127.0.0.1:28781".parse().unwrap();
    common::start_fixed_gateway(gateway, 200, r#"{"jsonrpc":"2.0","id":1"#).await;

    let err = client(gateway, 1).forward("eth_call", &[]).await.unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidResponse(_)));
}
