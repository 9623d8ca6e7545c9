//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use notify_proxy::config::{ListenerConfig, RelayConfig};
use notify_proxy::net::{BackendTarget, Listener, Multiplexer};
use notify_proxy::notify::{Dispatcher, Notifier, NotifyError};
use notify_proxy::transform::Transform;
use notify_proxy::Shutdown;

/// Notifier that hands every payload to a channel.
pub struct CaptureNotifier(pub mpsc::UnboundedSender<Value>);

#[async_trait]
impl Notifier for CaptureNotifier {
    async fn notify(&self, payload: &Value) -> Result<(), NotifyError> {
        let _ = self.0.send(payload.clone());
        Ok(())
    }
}

/// A running proxy bound to an ephemeral loopback port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy in front of `backend` delivering to `notifier`.
pub async fn start_proxy_with(
    backend: SocketAddr,
    notifier: Arc<dyn Notifier>,
    transform: Option<Box<dyn Transform>>,
) -> TestProxy {
    let listener = Listener::bind(&ListenerConfig {
        bind_address: "127.0.0.1".into(),
        port: Some(0),
        backlog: 200,
    })
    .unwrap();
    let addr = listener.local_addr().unwrap();

    let dispatcher = Dispatcher::spawn(notifier, 2, 64);
    let target = BackendTarget::new(backend, Duration::from_secs(1));
    let mut multiplexer = Multiplexer::new(listener, target, RelayConfig::default(), dispatcher);
    if let Some(transform) = transform {
        multiplexer = multiplexer.with_transform(transform);
    }

    let shutdown = Shutdown::new();
    tokio::spawn(multiplexer.run(shutdown.subscribe()));

    TestProxy { addr, shutdown }
}

/// Start a proxy whose notifications land in the returned channel.
pub async fn start_proxy(
    backend: SocketAddr,
    transform: Option<Box<dyn Transform>>,
) -> (TestProxy, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let proxy = start_proxy_with(backend, Arc::new(CaptureNotifier(tx)), transform).await;
    (proxy, rx)
}

/// Start a backend that writes back every byte it reads.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Start a backend that reports on the channel when a connection reaches EOF.
pub async fn start_eof_backend() -> (SocketAddr, mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = socket.read_to_end(&mut buf).await;
                let _ = tx.send(());
            });
        }
    });

    (addr, rx)
}

/// Start an HTTP/1.1 backend answering each request with `respond(method, path)`.
///
/// Requests are framed by `Content-Length` only; connections stay open until the
/// peer closes them.
pub async fn start_http_backend<F>(respond: F) -> SocketAddr
where
    F: Fn(&str, &str) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut buffered = Vec::new();
                while let Some((method, path)) = read_request(&mut socket, &mut buffered).await {
                    let response = respond(&method, &path);
                    if socket.write_all(&response).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream, buffered: &mut Vec<u8>) -> Option<(String, String)> {
    let mut chunk = [0u8; 1024];
    let head_len = loop {
        if let Some(pos) = buffered.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffered.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffered[..head_len]).into_owned();
    let mut parts = head.split("\r\n").next()?.split(' ');
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    let content_length = head
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(": "))
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let total = head_len + 4 + content_length;
    while buffered.len() < total {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffered.extend_from_slice(&chunk[..n]);
    }
    buffered.drain(..total);

    Some((method, path))
}

/// Build a response with a `Content-Length` framed body.
pub fn response(status: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n{}",
        status,
        body.len(),
        body
    )
    .into_bytes()
}

/// Read exactly `len` bytes or fail after a second.
pub async fn read_exact_timeout(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(1), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for relayed bytes")
        .expect("read failed");
    buf
}

/// Read until the peer closes, treating a reset as a close.
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut buf))
        .await
        .expect("connection was not closed");
    buf
}
