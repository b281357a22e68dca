//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use retry_storm::config::ServiceConfig;
use retry_storm::http::ServiceServer;
use retry_storm::lifecycle::Shutdown;

/// A service running on an ephemeral local port.
pub struct TestService {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestService {
    pub fn endpoint(&self) -> String {
        format!("http://{}/api/service", self.addr)
    }
}

pub fn service_config(capacity: usize, retry_after_secs: u64, work_latency_ms: u64) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.admission.capacity = capacity;
    config.admission.retry_after_secs = retry_after_secs;
    config.admission.work_latency_ms = work_latency_ms;
    config
}

/// Start the real service on `127.0.0.1:0`.
pub async fn start_service(config: ServiceConfig) -> TestService {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = ServiceServer::new(config);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    TestService {
        addr,
        shutdown,
        handle,
    }
}

/// Canned reply of a programmable backend.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl MockReply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: "{}".to_string(),
        }
    }

    pub fn with_retry_after(mut self, value: &str) -> Self {
        self.retry_after = Some(value.to_string());
        self
    }
}

/// Start a raw-TCP backend that answers every request with `f()`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        read_request(&mut socket).await;
                        let reply = f().await;
                        let status_text = match reply.status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            408 => "408 Request Timeout",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let retry_after = reply
                            .retry_after
                            .map(|v| format!("Retry-After: {}\r\n", v))
                            .unwrap_or_default();

                        let response = format!(
                            "HTTP/1.1 {}\r\n{}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            retry_after,
                            reply.body.len(),
                            reply.body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Consume one HTTP/1.1 request so closing the socket does not reset it.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut remaining = content_length.saturating_sub(buf.len() - header_end);
    while remaining > 0 {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => remaining = remaining.saturating_sub(n),
        }
    }
}

/// A port with nothing listening on it.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Client settings posting `{"id": "{{ id }}"}` to `endpoint`.
pub fn settings_json(endpoint: &str, min_delay_ms: u64, max_delay_ms: u64, max_retry: u32) -> String {
    serde_json::json!({
        "retry": {
            "minDelayIsMs": min_delay_ms,
            "maxDelayIsMs": max_delay_ms,
            "maxRetry": max_retry,
            "jitterStart": 1,
            "jitterEnd": 100
        },
        "request": {
            "verb": "POST",
            "endpoint": endpoint,
            "headers": { "Accept": "application/json" },
            "contentHeaders": { "Content-Type": "application/json" },
            "body": "{\"id\":\"{{ id }}\"}",
            "timeoutSecs": 10
        }
    })
    .to_string()
}
