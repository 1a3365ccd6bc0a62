//! Chrome DevTools Protocol session.
//!
//! Connects to a page target on the remote-debugging port, correlates
//! request/response frames by id, and feeds `Runtime.consoleAPICalled`
//! events into a shared [`ConsoleBuffer`]. Console capture is a
//! capability-scoped observer: the page's own console functions are never
//! replaced, the protocol reports every call to us on the side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::capture::{self, ConsoleBuffer, LogEntry};
use crate::errors::InspectError;

/// Deadline for a single protocol call.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// A debuggable target as reported by `GET /json/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: Option<String>,
}

/// Result of evaluating a snippet in the inspected page: either a
/// JSON-serializable value or the exception the page threw.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Value(Value),
    Exception(String),
}

/// One `Runtime.consoleAPICalled` event payload (the fields we consume).
#[derive(Debug, Deserialize)]
struct ConsoleApiCalled {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    args: Vec<RemoteObject>,
    #[serde(default)]
    timestamp: f64,
}

/// A remote object mirrored over the protocol (the fields we consume).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Discover the first debuggable `page` target, optionally filtered by a
/// URL/title substring.
pub async fn discover_page_target(
    host: &str,
    port: u16,
    filter: Option<&str>,
) -> Result<TargetInfo, InspectError> {
    discover_page_target_with(host, port, filter, CALL_TIMEOUT).await
}

async fn discover_page_target_with(
    host: &str,
    port: u16,
    filter: Option<&str>,
    timeout: Duration,
) -> Result<TargetInfo, InspectError> {
    let endpoint = format!("http://{host}:{port}/json/list");
    tracing::debug!(%endpoint, "discovering page targets");
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(InspectError::Discovery)?;
    let targets: Vec<TargetInfo> = client
        .get(&endpoint)
        .send()
        .await
        .map_err(InspectError::Discovery)?
        .error_for_status()
        .map_err(InspectError::Discovery)?
        .json()
        .await
        .map_err(InspectError::Discovery)?;

    targets
        .into_iter()
        .find(|t| {
            t.kind == "page"
                && t.ws_url.is_some()
                && filter.is_none_or(|f| t.url.contains(f) || t.title.contains(f))
        })
        .ok_or(InspectError::NoTarget)
}

/// An attached devtools session for one page target.
pub struct CdpSession {
    writer: Arc<AsyncMutex<SplitSink<WsStream, Message>>>,
    pending: PendingMap,
    buffer: Arc<Mutex<ConsoleBuffer>>,
    next_id: AtomicU64,
    observer_installed: bool,
    reader: tokio::task::JoinHandle<()>,
    pub target: TargetInfo,
}

impl CdpSession {
    /// Discover a page target and attach to its devtools socket.
    pub async fn connect(
        host: &str,
        port: u16,
        filter: Option<&str>,
    ) -> Result<Self, InspectError> {
        let target = discover_page_target(host, port, filter).await?;
        let ws_url = target.ws_url.clone().ok_or(InspectError::NoTarget)?;
        tracing::debug!(url = %target.url, "attaching to page target");

        let (stream, _) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(InspectError::Connect)?;
        let (writer, reader_half) = stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let buffer = Arc::new(Mutex::new(ConsoleBuffer::new()));
        let reader = tokio::spawn(route_frames(reader_half, pending.clone(), buffer.clone()));

        Ok(Self {
            writer: Arc::new(AsyncMutex::new(writer)),
            pending,
            buffer,
            next_id: AtomicU64::new(1),
            observer_installed: false,
            reader,
            target,
        })
    }

    /// Install the console observer, reporting whether this call installed
    /// it. Repeated activation is a no-op and returns `false`.
    pub async fn enable_console_observer(&mut self) -> Result<bool, InspectError> {
        if self.observer_installed {
            return Ok(false);
        }
        self.call("Runtime.enable", serde_json::json!({})).await?;
        self.observer_installed = true;
        Ok(true)
    }

    pub fn observer_installed(&self) -> bool {
        self.observer_installed
    }

    /// Evaluate a snippet in the inspected page, returning either its
    /// JSON-serializable value or the exception payload.
    pub async fn evaluate(&self, expression: &str) -> Result<EvalOutcome, InspectError> {
        let result = self
            .call(
                "Runtime.evaluate",
                serde_json::json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;
        Ok(parse_eval_result(&result))
    }

    /// Copy the captured console entries out of the session buffer.
    pub fn snapshot_logs(&self) -> Vec<LogEntry> {
        self.buffer.lock().map(|b| b.snapshot()).unwrap_or_default()
    }

    pub fn clear_logs(&self) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, InspectError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| InspectError::Protocol("response router lock poisoned".to_string()))?
            .insert(id, tx);

        let frame = serde_json::json!({ "id": id, "method": method, "params": params });
        {
            let mut writer = self.writer.lock().await;
            writer
                .send(Message::Text(frame.to_string().into()))
                .await
                .map_err(InspectError::Connect)?;
        }

        let response = match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(InspectError::Protocol(
                    "devtools connection closed before a response arrived".to_string(),
                ));
            }
            Err(_) => {
                if let Ok(mut pending) = self.pending.lock() {
                    pending.remove(&id);
                }
                return Err(InspectError::Timeout);
            }
        };

        if let Some(err) = response.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown protocol error");
            return Err(InspectError::Protocol(message.to_string()));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Route incoming frames: responses to their pending caller, console events
/// into the bounded buffer, everything else ignored.
async fn route_frames(
    mut reader: futures_util::stream::SplitStream<WsStream>,
    pending: PendingMap,
    buffer: Arc<Mutex<ConsoleBuffer>>,
) {
    while let Some(frame) = reader.next().await {
        let raw = match frame {
            Ok(Message::Text(text)) => text,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(%err, "devtools socket closed");
                break;
            }
        };
        let Ok(msg) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        if let Some(id) = msg.get("id").and_then(Value::as_u64) {
            let sender = pending.lock().ok().and_then(|mut map| map.remove(&id));
            if let Some(tx) = sender {
                let _ = tx.send(msg);
            }
        } else if msg.get("method").and_then(Value::as_str) == Some("Runtime.consoleAPICalled") {
            if let Some(params) = msg.get("params") {
                record_console_event(params, &buffer);
            }
        }
    }
}

fn record_console_event(params: &Value, buffer: &Arc<Mutex<ConsoleBuffer>>) {
    let Ok(event) = serde_json::from_value::<ConsoleApiCalled>(params.clone()) else {
        return;
    };
    let kind = capture::kind_from_console_type(&event.kind);
    let text = capture::render_console_args(&event.args);
    let captured_at = timestamp_from_epoch_ms(event.timestamp);
    if let Ok(mut buffer) = buffer.lock() {
        buffer.push(kind, text, captured_at);
    }
}

fn timestamp_from_epoch_ms(ms: f64) -> DateTime<Utc> {
    if ms > 0.0 {
        if let Some(at) = Utc.timestamp_millis_opt(ms as i64).single() {
            return at;
        }
    }
    Utc::now()
}

/// Split a `Runtime.evaluate` result into a value or an exception payload.
fn parse_eval_result(result: &Value) -> EvalOutcome {
    if let Some(details) = result.get("exceptionDetails") {
        let message = details
            .get("exception")
            .and_then(|e| e.get("description"))
            .and_then(Value::as_str)
            .or_else(|| details.get("text").and_then(Value::as_str))
            .unwrap_or("Unknown evaluation error");
        return EvalOutcome::Exception(message.to_string());
    }
    EvalOutcome::Value(
        result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null),
    )
}
