//! Shared utilities for integration testing: mock gateways and raw clients.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use particle_proxy::blockchain::UpstreamCredential;
use particle_proxy::config::{ProxyConfig, UpstreamConfig};

pub const PROJECT_ID: &str = "test-project";
pub const PROJECT_SECRET: &str = "test-secret";
/// `Basic base64("test-project:test-secret")`
pub const EXPECTED_AUTH: &str = "Basic dGVzdC1wcm9qZWN0OnRlc3Qtc2VjcmV0";

/// One request seen by a mock gateway.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type Recorder = Arc<Mutex<Vec<RecordedRequest>>>;

pub fn credential() -> Arc<UpstreamCredential> {
    Arc::new(UpstreamCredential {
        project_id: PROJECT_ID.into(),
        project_secret: PROJECT_SECRET.into(),
    })
}

/// Proxy config pointed at a mock gateway.
pub fn proxy_config(base_port: u16, gateway: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.base_port = base_port;
    config.upstream = UpstreamConfig {
        base_url: format!("http://{}/evm-chain", gateway),
        request_timeout_secs: 5,
        ..Default::default()
    };
    config
}

/// Start a programmable mock gateway. `f` maps the decoded request body to
/// `(status, response body)`.
pub async fn start_programmable_gateway<F, Fut>(addr: SocketAddr, f: F) -> Recorder
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let recorder: Recorder = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);
    let rec = recorder.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let rec = rec.clone();
                    tokio::spawn(async move {
                        let Some((headers, body)) = read_http_request(&mut socket).await else {
                            return;
                        };
                        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                        rec.lock().unwrap().push(RecordedRequest {
                            headers,
                            body: body.clone(),
                        });

                        let (status, body) = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    recorder
}

/// Gateway answering `eth_chainId` with the envelope's chain id and every
/// other method with an echo of what it received.
pub async fn start_echo_gateway(addr: SocketAddr) -> Recorder {
    start_programmable_gateway(addr, |request| async move {
        let chain_id = request["chainId"].as_u64().unwrap_or_default();
        let result = if request["method"] == "eth_chainId" {
            json!(format!("0x{:x}", chain_id))
        } else {
            json!({
                "chainId": chain_id,
                "method": request["method"],
                "params": request["params"],
            })
        };
        let response = json!({"jsonrpc": "2.0", "id": 1, "result": result});
        (200, response.to_string())
    })
    .await
}

/// Gateway returning the same response to everything.
pub async fn start_fixed_gateway(addr: SocketAddr, status: u16, body: &'static str) -> Recorder {
    start_programmable_gateway(addr, move |_| async move { (status, body.to_string()) }).await
}

/// Read one HTTP request (head + Content-Length body).
async fn read_http_request(socket: &mut TcpStream) -> Option<(Vec<(String, String)>, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut request = httparse::Request::new(&mut headers);
        if let Ok(httparse::Status::Complete(head_len)) = request.parse(&buf) {
            let headers: Vec<(String, String)> = request
                .headers
                .iter()
                .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                .collect();
            let content_length = headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_len + content_length {
                let body = buf[head_len..head_len + content_length].to_vec();
                return Some((headers, body));
            }
        }
    }
}

/// Build a raw HTTP/1.1 POST with a JSON body.
pub fn post(body: &str) -> Vec<u8> {
    format!(
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

/// Send raw bytes to the proxy and read until it closes the connection.
///
/// A reset counts as "no response".
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let _ = stream.write_all(request).await;
    let mut response = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("proxy did not close the connection");
    if read.is_err() {
        response.clear();
    }
    String::from_utf8_lossy(&response).into_owned()
}

/// Split a raw response into (status line, headers block, body).
pub fn split_response(response: &str) -> (&str, &str, &str) {
    let (head, body) = response.split_once("\r\n\r\n").expect("no end of head");
    let (status, headers) = head.split_once("\r\n").unwrap_or((head, ""));
    (status, headers, body)
}
