//! Integration tests for openqa-client.
//!
//! These tests verify the client API surface and the per-instance request
//! gate. The gate tests run against a small in-process HTTP responder that
//! records how many requests it is serving at the same time.

use openqa_client::{ClientError, Instance, InstanceConfig, O3_URL, OSD_URL};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[test]
fn test_instance_construction() {
    assert!(Instance::new("http://localhost:9526").is_ok());
    assert!(Instance::new("https://openqa.opensuse.org").is_ok());
}

#[test]
fn test_instance_invalid_url() {
    match Instance::new("openqa.opensuse.org") {
        Err(ClientError::InvalidUrl(msg)) => assert!(msg.contains("http://")),
        other => panic!("Expected InvalidUrl error, got {:?}", other),
    }
}

#[test]
fn test_url_normalization() {
    let a = Instance::new("http://localhost:9526").unwrap();
    let b = Instance::new("http://localhost:9526/").unwrap();
    assert_eq!(a.base_url(), b.base_url());
}

#[test]
fn test_builder_pattern() {
    let instance = Instance::new("http://localhost:9526")
        .unwrap()
        .with_credentials("KEY", "SECRET")
        .with_verbose(true)
        .with_max_recursion_depth(3)
        .with_allow_parallel(true);

    assert!(instance.has_credentials());
    assert!(instance.is_verbose());
    assert_eq!(instance.max_recursion_depth(), 3);
}

#[test]
fn test_from_config() {
    let config = InstanceConfig {
        remote: "osd".to_string(),
        api_key: Some("KEY".to_string()),
        api_secret: Some("SECRET".to_string()),
        max_recursions: 4,
        ..InstanceConfig::default()
    };
    let instance = Instance::from_config(&config).unwrap();
    assert_eq!(instance.base_url(), OSD_URL);
    assert!(instance.has_credentials());
    assert_eq!(instance.max_recursion_depth(), 4);

    let half = InstanceConfig {
        api_key: Some("KEY".to_string()),
        ..InstanceConfig::default()
    };
    let instance = Instance::from_config(&half).unwrap();
    assert_eq!(instance.base_url(), O3_URL);
    assert!(!instance.has_credentials());
}

#[test]
fn test_config_from_json() {
    let config: InstanceConfig =
        serde_json::from_str(r#"{"remote": "http://localhost:9526", "verbose": true}"#).unwrap();
    assert_eq!(config.remote, "http://localhost:9526");
    assert!(config.verbose);
    assert_eq!(config.max_recursions, 10);
}

#[test]
fn test_error_display() {
    let err = ClientError::Status {
        status: 404,
        body: None,
    };
    assert_eq!(err.to_string(), "http status code 404");
    assert_eq!(err.status(), Some(404));

    let err = ClientError::RecursionLimit { depth: 10 };
    assert!(err.to_string().contains("maximum recursion depth"));
    assert_eq!(err.status(), None);
}

/// Concurrency bookkeeping of the test responder.
#[derive(Default)]
struct Load {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    served: AtomicUsize,
}

/// Start a responder answering every request with the same job after `delay`.
async fn spawn_responder(delay: Duration) -> (String, Arc<Load>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let load = Arc::new(Load::default());

    let shared = load.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, shared.clone(), delay));
        }
    });

    (format!("http://{}", addr), load)
}

async fn serve(mut socket: TcpStream, load: Arc<Load>, delay: Duration) {
    // Requests here are GETs without a body; the head is all there is.
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    let now = load.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    load.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(delay).await;
    load.in_flight.fetch_sub(1, Ordering::SeqCst);
    load.served.fetch_add(1, Ordering::SeqCst);

    let body = r#"{"job": {"id": 1, "name": "minimal", "state": "done"}}"#;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn fetch_concurrently(a: Instance, b: Instance) {
    let first = tokio::spawn(async move { a.get_job(1).await });
    let second = tokio::spawn(async move { b.get_job(1).await });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_requests_are_serialized_per_instance() {
    let (url, load) = spawn_responder(Duration::from_millis(150)).await;
    let instance = Instance::new(url).unwrap();

    fetch_concurrently(instance.clone(), instance).await;

    assert_eq!(load.served.load(Ordering::SeqCst), 2);
    assert_eq!(load.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_allow_parallel_lifts_gate() {
    let (url, load) = spawn_responder(Duration::from_millis(150)).await;
    let instance = Instance::new(url).unwrap().with_allow_parallel(true);

    fetch_concurrently(instance.clone(), instance).await;

    assert_eq!(load.served.load(Ordering::SeqCst), 2);
    assert_eq!(load.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_separate_instances_do_not_contend() {
    let (url, load) = spawn_responder(Duration::from_millis(150)).await;
    let a = Instance::new(url.as_str()).unwrap();
    let b = Instance::new(url.as_str()).unwrap();

    fetch_concurrently(a, b).await;

    assert_eq!(load.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_gate_released_after_failure() {
    // Nothing listens on port 1; both requests fail but neither blocks the other forever.
    let instance = Instance::new("http://127.0.0.1:1").unwrap();
    let other = instance.clone();

    let first = tokio::spawn(async move { instance.get_job(1).await });
    let second = tokio::spawn(async move { other.get_job(2).await });
    let result = tokio::time::timeout(Duration::from_secs(10), async {
        (first.await.unwrap(), second.await.unwrap())
    })
    .await
    .expect("gate was not released");

    assert!(matches!(result.0, Err(ClientError::Transport(_))));
    assert!(matches!(result.1, Err(ClientError::Transport(_))));
}
