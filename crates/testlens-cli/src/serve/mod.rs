//! Line-delimited JSON command server on stdin/stdout.
//!
//! Each request line is `{"id": 1, "command": "searchAllTests", "arguments": [...]}`
//! and is answered by one response line carrying the same id. Requests run on
//! blocking worker tasks, so a slow search never holds up later requests;
//! `{"id": 2, "command": "cancel", "arguments": [1]}` cancels request 1.
//!
//! # Module Structure
//!
//! - `models` - request/response types

mod models;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use testlens_core::{CancellationToken, TestService, WorkspaceIndex};

use models::{Request, Response, CANCEL_COMMAND};

// =============================================================================
// Application State
// =============================================================================

/// Shared state for the server.
pub struct AppState {
    pub service: Arc<TestService<WorkspaceIndex>>,
    /// Tokens of in-flight requests, by request id.
    pub pending: Mutex<HashMap<u64, CancellationToken>>,
}

impl AppState {
    pub fn new(service: Arc<TestService<WorkspaceIndex>>) -> Self {
        Self {
            service,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Token for a new request, or `None` while another request with the
    /// same id is still in flight.
    fn register(&self, id: u64) -> Option<CancellationToken> {
        let mut pending = self.pending.lock().ok()?;
        if pending.contains_key(&id) {
            return None;
        }
        let token = CancellationToken::new();
        pending.insert(id, token.clone());
        Some(token)
    }

    fn finish(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }

    fn cancel(&self, id: u64) -> bool {
        match self.pending.lock() {
            Ok(pending) => match pending.get(&id) {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Answer a `cancel` request: `true` if the target was in flight.
    fn cancel_response(&self, request: &Request) -> Response {
        match request.arguments.first().and_then(Value::as_u64) {
            Some(target) => Response::ok(request.id, Value::Bool(self.cancel(target))),
            None => Response::error(Some(request.id), "cancel expects a request id"),
        }
    }
}

// =============================================================================
// Server Entry Point
// =============================================================================

/// Serve requests from stdin until it closes, then drain in-flight work.
pub async fn start_server(service: Arc<TestService<WorkspaceIndex>>) -> color_eyre::Result<()> {
    let state = Arc::new(AppState::new(service));

    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

    // Single writer so response lines never interleave
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let mut line = match serde_json::to_string(&response) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize response");
                    continue;
                }
            };
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    });

    let mut workers = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable request");
                let _ = tx.send(Response::error(None, format!("Invalid request: {}", e)));
                continue;
            }
        };

        if request.command == CANCEL_COMMAND {
            let _ = tx.send(state.cancel_response(&request));
            continue;
        }

        let Some(token) = state.register(request.id) else {
            tracing::warn!(id = request.id, "duplicate request id");
            let message = format!("Request {} is already in flight", request.id);
            let _ = tx.send(Response::error(Some(request.id), message));
            continue;
        };
        let state = Arc::clone(&state);
        let tx = tx.clone();
        workers.spawn(async move {
            let id = request.id;
            let service = Arc::clone(&state.service);
            let outcome = tokio::task::spawn_blocking(move || {
                service.execute(&request.command, &request.arguments, &token)
            })
            .await;
            state.finish(id);

            let response = match outcome {
                Ok(Ok(result)) => Response::ok(id, result),
                Ok(Err(e)) => Response::error(Some(id), e),
                Err(e) => Response::error(Some(id), format!("Request failed: {}", e)),
            };
            let _ = tx.send(response);
        });
    }

    while workers.join_next().await.is_some() {}
    drop(tx);
    writer.await?;

    Ok(())
}
