//! The MCP request server — newline-delimited JSON-RPC over a byte stream.
//!
//! The read loop is sequential; each request is dispatched to its own task
//! so a slow tool call never blocks a quick one. The outbound stream is
//! guarded by a single lock so encoded messages are written atomically and
//! never interleave. On end of input the server waits for every in-flight
//! worker before returning, so no response is lost.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;

use crate::config::AimemoConfig;
use crate::mcp::protocol::{
    error_response, success_response, ContentItem, LogMessageParams, Notification, Request,
    Response, ToolCallParams, ToolResult, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use crate::mcp::tools;

/// Input buffer size per message.
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Per-call deadline for tool invocations. Initialize and notifications are
/// not subject to it.
const TOOL_DEADLINE: Duration = Duration::from_secs(5);

type OutboundSink = Arc<tokio::sync::Mutex<Option<Box<dyn AsyncWrite + Send + Unpin>>>>;

/// Wrap a `ToolResult` in a success envelope.
fn tool_result_response(id: serde_json::Value, result: ToolResult) -> Response {
    match serde_json::to_value(&result) {
        Ok(value) => success_response(id, value),
        Err(err) => error_response(id, INTERNAL_ERROR, format!("marshal error: {err}")),
    }
}

/// The MCP JSON-RPC 2.0 server bound to one database context.
#[derive(Clone)]
pub struct Server {
    db: Arc<Mutex<Connection>>,
    db_path: String,
    server_name: String,
    server_version: String,
    /// Outbound encoder; `None` until a serve loop installs its writer
    /// (notifications are silently dropped outside a serve loop, e.g. in
    /// unit tests).
    out: OutboundSink,
}

impl Server {
    pub fn new(conn: Connection, db_path: impl Into<String>, config: &AimemoConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            db_path: db_path.into(),
            server_name: config.mcp.server_name.clone(),
            server_version: config.mcp.server_version.clone(),
            out: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Path of the backing database file, as reported by `memory_context`.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Serve over stdin/stdout.
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Read newline-delimited requests from `reader`, dispatching each to its
    /// own task and writing responses to `writer`. Returns when the input
    /// reaches end of stream and all workers have finished.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        *self.out.lock().await = Some(Box::new(writer));

        let mut lines = BufReader::with_capacity(MAX_MESSAGE_BYTES, reader).lines();
        let mut workers = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            let request: Request = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(err) => {
                    // A single malformed line is dropped without closing the
                    // channel.
                    tracing::debug!(error = %err, "malformed request");
                    continue;
                }
            };

            let server = self.clone();
            workers.spawn(async move {
                if let Some(response) = server.handle(request).await {
                    server.write_message(&response).await;
                }
            });
        }

        // EOF: no new calls start, but in-flight responses still go out.
        while workers.join_next().await.is_some() {}
        Ok(())
    }

    /// Dispatch one request. Returns `None` for notifications, which produce
    /// no response.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request)),
            "notifications/initialized" => {
                self.send_memory_ready().await;
                None
            }
            "tools/list" => Some(success_response(
                request.id,
                json!({ "tools": tools::all_tools() }),
            )),
            "tools/call" => Some(self.handle_tool_call(request).await),
            _ => Some(error_response(request.id, METHOD_NOT_FOUND, "method not found")),
        }
    }

    fn handle_initialize(&self, request: Request) -> Response {
        success_response(
            request.id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version,
                },
                "capabilities": {
                    "tools": {},
                },
            }),
        )
    }

    /// Run the named tool under the 5-second deadline. A failing tool is a
    /// *success* envelope carrying `ToolResult{isError:true}`; JSON-RPC
    /// errors are reserved for protocol-level failures.
    async fn handle_tool_call(&self, request: Request) -> Response {
        let params: ToolCallParams = match serde_json::from_value(request.params) {
            Ok(params) => params,
            Err(err) => {
                return error_response(request.id, INVALID_PARAMS, format!("invalid params: {err}"))
            }
        };

        let outcome =
            match tokio::time::timeout(TOOL_DEADLINE, tools::dispatch(self, &params.name, params.arguments)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow!("tool call deadline exceeded")),
            };

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                let result = ToolResult {
                    content: vec![ContentItem::text(format!("{err:#}"))],
                    is_error: true,
                };
                return tool_result_response(request.id, result);
            }
        };

        let text = match serde_json::to_string(&value) {
            Ok(text) => text,
            Err(err) => {
                return error_response(request.id, INTERNAL_ERROR, format!("marshal error: {err}"))
            }
        };

        let result = ToolResult {
            content: vec![ContentItem::text(text)],
            is_error: false,
        };
        tool_result_response(request.id, result)
    }

    /// Emit the one server-initiated notification after the handshake
    /// completes, prompting the client to load prior context immediately.
    async fn send_memory_ready(&self) {
        let notification = Notification {
            jsonrpc: "2.0",
            method: "notifications/message",
            params: LogMessageParams {
                level: "info",
                data: "Memory server ready. Call memory_context({}) NOW to restore prior \
                       session context before responding to the user. Do not skip this step."
                    .to_string(),
            },
        };
        self.write_message(&notification).await;
    }

    /// Serialize a message and write it atomically, newline-terminated. A
    /// write failure is logged; it does not take down the read loop.
    async fn write_message<T: Serialize>(&self, message: &T) {
        let mut encoded = match serde_json::to_vec(message) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(error = %err, "encode response");
                return;
            }
        };
        encoded.push(b'\n');

        let mut guard = self.out.lock().await;
        let Some(writer) = guard.as_mut() else {
            return; // not serving a stream (unit tests)
        };
        if let Err(err) = writer.write_all(&encoded).await {
            tracing::error!(error = %err, "write response");
            return;
        }
        if let Err(err) = writer.flush().await {
            tracing::error!(error = %err, "flush response");
        }
    }

    /// Run a closure against the shared connection on the blocking pool.
    /// Every caller acquires and releases the handle independently; nothing
    /// may hold a cursor across one of these calls.
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            f(&conn)
        })
        .await
        .map_err(|e| anyhow!("db task failed: {e}"))?
    }
}
