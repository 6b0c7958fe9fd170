//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use resilience_gateway::cache::StoredResponse;
use resilience_gateway::proxy::{FetchError, InterceptedRequest, Network};
use resilience_gateway::stream::{Channel, StreamEvent, Transport, TransportError};

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` maps the request path to `Some((status, body))`, or `None` to drop
/// the connection without answering.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(&str) -> Option<(u16, String)> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(socket);
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.is_err() {
                            return;
                        }
                        loop {
                            let mut line = String::new();
                            match reader.read_line(&mut line).await {
                                Ok(0) | Err(_) => return,
                                Ok(_) if line == "\r\n" => break,
                                Ok(_) => continue,
                            }
                        }
                        let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

                        let mut socket = reader.into_inner();
                        let Some((status, body)) = f(&path) else {
                            let _ = socket.shutdown().await;
                            return;
                        };
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
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

/// In-memory [`Network`] that records every URL it is asked for.
#[derive(Default)]
pub struct RecordingNetwork {
    routes: DashMap<String, (u16, String)>,
    offline: AtomicBool,
    requests: Mutex<Vec<String>>,
}

impl RecordingNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, status: u16, body: &str) {
        self.routes.insert(path.to_string(), (status, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Network for RecordingNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        self.requests.lock().unwrap().push(request.url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::unreachable(request.url.as_str(), "Failed to fetch"));
        }
        let (status, body) = self
            .routes
            .get(request.url.path())
            .map(|r| r.value().clone())
            .unwrap_or((404, "not found".to_string()));
        Ok(StoredResponse::new(status, body).with_header("content-type", "text/plain"))
    }
}

enum Script {
    Refuse,
    Accept(ScriptedChannel),
}

pub struct ScriptedChannel {
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl Channel for ScriptedChannel {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.outbound
            .send(payload)
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inbound.close();
        Ok(())
    }
}

/// Remote end of one accepted scripted connection. Dropping it (or calling
/// `drop_connection`) closes the channel from the server side.
pub struct Remote {
    inbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Remote {
    pub fn push(&self, message: &str) {
        if let Some(tx) = &self.inbound {
            tx.send(message.as_bytes().to_vec()).unwrap();
        }
    }

    pub fn drop_connection(&mut self) {
        self.inbound = None;
    }

    pub async fn received(&mut self) -> String {
        let bytes = tokio::time::timeout(Duration::from_secs(300), self.outbound.recv())
            .await
            .expect("timed out waiting for outbound message")
            .expect("client channel gone");
        String::from_utf8(bytes).unwrap()
    }
}

/// Transport whose connection outcomes are scripted in advance. With no
/// script left, `open` never resolves.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    attempts: AtomicU32,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refuse(&self) {
        self.scripts.lock().unwrap().push_back(Script::Refuse);
    }

    pub fn accept(&self) -> Remote {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().push_back(Script::Accept(ScriptedChannel {
            inbound: in_rx,
            outbound: out_tx,
        }));
        Remote {
            inbound: Some(in_tx),
            outbound: out_rx,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Shared handle so tests keep scripting after handing the transport over.
#[derive(Clone)]
pub struct SharedTransport(pub Arc<ScriptedTransport>);

impl Transport for SharedTransport {
    type Channel = ScriptedChannel;

    async fn open(&self) -> Result<ScriptedChannel, TransportError> {
        self.0.attempts.fetch_add(1, Ordering::SeqCst);
        let script = self.0.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Accept(channel)) => Ok(channel),
            Some(Script::Refuse) => Err(TransportError::Connect("connection refused".into())),
            None => std::future::pending().await,
        }
    }
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
    tokio::time::timeout(Duration::from_secs(300), events.recv())
        .await
        .expect("timed out waiting for stream event")
        .expect("event channel closed")
}
