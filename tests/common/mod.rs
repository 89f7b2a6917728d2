//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ollama_gate::upstream::UpstreamClient;
use ollama_gate::{HttpServer, ProxyConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const KEY: &str = "test-key";

/// A request as the mock backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub head: String,
    pub body: Vec<u8>,
}

/// What the mock backend answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Json {
        status: u16,
        body: String,
        delay: Duration,
    },
    /// Chunked body, one write per chunk. `truncate` drops the socket
    /// after the last chunk instead of finishing the body.
    Stream {
        chunks: Vec<String>,
        delay: Duration,
        truncate: bool,
    },
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Reply::Json {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow_json(delay: Duration, body: &str) -> Self {
        Reply::Json {
            status: 200,
            body: body.to_string(),
            delay,
        }
    }

    pub fn stream(chunks: &[&str], delay: Duration) -> Self {
        Reply::Stream {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay,
            truncate: false,
        }
    }

    pub fn truncated_stream(chunks: &[&str]) -> Self {
        Reply::Stream {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay: Duration::from_millis(20),
            truncate: true,
        }
    }
}

/// Handle to a running mock backend.
///
/// JSON replies keep the connection alive; stream replies close it.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
    open_sockets: Arc<AtomicUsize>,
    peak_sockets: Arc<AtomicUsize>,
    accepted: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of exchanges the backend handled at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Exchanges whose reply was fully written.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Connections accepted and not yet closed by the peer.
    pub fn open_sockets(&self) -> usize {
        self.open_sockets.load(Ordering::SeqCst)
    }

    /// Highest number of connections open at once.
    pub fn peak_open_sockets(&self) -> usize {
        self.peak_sockets.load(Ordering::SeqCst)
    }

    /// Connections accepted over the backend's lifetime.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_backend<F>(reply: F) -> MockBackend
where
    F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        requests: Arc::new(Mutex::new(Vec::new())),
        active: Arc::new(AtomicUsize::new(0)),
        peak: Arc::new(AtomicUsize::new(0)),
        finished: Arc::new(AtomicUsize::new(0)),
        open_sockets: Arc::new(AtomicUsize::new(0)),
        peak_sockets: Arc::new(AtomicUsize::new(0)),
        accepted: Arc::new(AtomicUsize::new(0)),
    };
    let reply = Arc::new(reply);

    let handle = backend.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let reply = reply.clone();
            let backend = handle.clone();
            backend.accepted.fetch_add(1, Ordering::SeqCst);
            let open = backend.open_sockets.fetch_add(1, Ordering::SeqCst) + 1;
            backend.peak_sockets.fetch_max(open, Ordering::SeqCst);

            tokio::spawn(async move {
                while let Some(request) = read_request(&mut socket).await {
                    let answer = reply(&request);
                    backend.requests.lock().unwrap().push(request);

                    let now = backend.active.fetch_add(1, Ordering::SeqCst) + 1;
                    backend.peak.fetch_max(now, Ordering::SeqCst);
                    let keep_alive = write_reply(&mut socket, answer).await;
                    backend.active.fetch_sub(1, Ordering::SeqCst);
                    backend.finished.fetch_add(1, Ordering::SeqCst);

                    if !keep_alive {
                        break;
                    }
                }
                backend.open_sockets.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });

    backend
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    Some(RecordedRequest {
        method: request_line.next().unwrap_or_default().to_string(),
        path: request_line.next().unwrap_or_default().to_string(),
        head: head.clone(),
        body: buf[body_start..body_start + content_length].to_vec(),
    })
}

/// Write one reply. Returns whether the connection stays open.
async fn write_reply(socket: &mut TcpStream, reply: Reply) -> bool {
    match reply {
        Reply::Json { status, body, delay } => {
            tokio::time::sleep(delay).await;
            let status_text = match status {
                200 => "200 OK",
                400 => "400 Bad Request",
                404 => "404 Not Found",
                500 => "500 Internal Server Error",
                _ => "200 OK",
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                status_text,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.is_ok()
        }
        Reply::Stream {
            chunks,
            delay,
            truncate,
        } => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return false;
            }
            for chunk in chunks {
                tokio::time::sleep(delay).await;
                let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return false;
                }
                let _ = socket.flush().await;
            }
            if truncate {
                // Close without the terminating zero-length chunk.
                return false;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
            false
        }
    }
}

/// Default config pointing at a backend, with [`KEY`] authorized.
pub fn proxy_config(backend: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.base_url = format!("http://{}", backend);
    config.auth.api_keys = vec![KEY.to_string(), "second-key".to_string()];
    config
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub upstream: UpstreamClient,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let upstream = server.upstream().clone();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        upstream,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
