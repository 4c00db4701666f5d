//! CDP WebSocket connection
//!
//! JSON-RPC over a single DevTools WebSocket. Commands are matched to their
//! responses by id through a table of pending oneshot senders that a
//! background reader task completes. Events are not consumed.

use crate::Error;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    pub id: u64,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Per-command response deadlines
#[derive(Debug, Clone)]
pub struct CdpTimeouts {
    pub default: Duration,
    pub navigation: Duration,
    pub execution: Duration,
}

impl Default for CdpTimeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(30),
            navigation: Duration::from_secs(60),
            execution: Duration::from_secs(30),
        }
    }
}

impl CdpTimeouts {
    pub fn for_method(&self, method: &str) -> Duration {
        let method = method.to_lowercase();
        if method.contains("navigate") || method.contains("reload") {
            self.navigation
        } else if method.starts_with("runtime.") {
            self.execution
        } else {
            self.default
        }
    }
}

#[derive(Debug)]
struct PendingCommand {
    sender: oneshot::Sender<CdpRpcResponse>,
    method: String,
}

/// Connection to one DevTools target
#[derive(Debug)]
pub struct CdpConnection {
    url: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    next_id: AtomicU64,
    pending: PendingMap,
    is_active: Arc<AtomicBool>,
    timeouts: CdpTimeouts,
}

impl CdpConnection {
    /// Connect to a target WebSocket (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn connect<S: Into<String>>(url: S, timeouts: CdpTimeouts) -> Result<Self, Error> {
        let url = url.into();
        info!("Connecting to WebSocket: {}", url);

        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect: {}", e)))?;
        let (sink, stream) = ws.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let is_active = Arc::new(AtomicBool::new(true));

        tokio::spawn(Self::read_loop(
            stream,
            Arc::clone(&pending),
            Arc::clone(&is_active),
        ));

        info!("WebSocket connection established");
        Ok(Self {
            url,
            sink: Mutex::new(sink),
            next_id: AtomicU64::new(1),
            pending,
            is_active,
            timeouts,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    async fn read_loop(mut stream: SplitStream<WsStream>, pending: PendingMap, is_active: Arc<AtomicBool>) {
        debug!("CDP read loop started");
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => Self::dispatch(&text, &pending).await,
                Ok(Message::Close(_)) => {
                    info!("WebSocket close frame received");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            }
        }
        is_active.store(false, Ordering::SeqCst);
        // Waiters see a closed channel instead of hanging until their deadline
        pending.lock().await.clear();
        debug!("CDP read loop exited");
    }

    async fn dispatch(text: &str, pending: &PendingMap) {
        // Events carry no id and are ignored
        let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) else {
            return;
        };
        match pending.lock().await.remove(&response.id) {
            Some(cmd) => {
                debug!("Response for command {}: {}", response.id, cmd.method);
                let _ = cmd.sender.send(response);
            }
            None => warn!("Received response for unknown command ID: {}", response.id),
        }
    }

    /// Send a command and wait for its result
    pub async fn send(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        if !self.is_active() {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };
        let json = serde_json::to_string(&request)?;
        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingCommand {
                sender,
                method: method.to_string(),
            },
        );

        if let Err(e) = self.sink.lock().await.send(Message::Text(json)).await {
            self.pending.lock().await.remove(&id);
            return Err(Error::websocket(format!("Failed to send message: {}", e)));
        }

        let deadline = self.timeouts.for_method(method);
        match tokio::time::timeout(deadline, receiver).await {
            Ok(Ok(response)) => match response.error {
                Some(e) => Err(Error::cdp(format!(
                    "{} failed: {} (code: {}){}",
                    method,
                    e.message,
                    e.code,
                    e.data.map(|d| format!(" {}", d)).unwrap_or_default()
                ))),
                None => Ok(response.result),
            },
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed while waiting for {}",
                method
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::timeout(format!("{} timed out after {:?}", method, deadline)))
            }
        }
    }

    pub async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP WebSocket connection");
        self.is_active.store(false, Ordering::SeqCst);
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))
    }
}
