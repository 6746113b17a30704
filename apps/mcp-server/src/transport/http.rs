//! HTTP/SSE transport for MCP
//!
//! - `POST /mcp`: one JSON-RPC message per request, answered in the body
//! - `GET /sse` + `POST /messages?session_id=...`: the MCP SSE transport.
//!   The stream opens with an `endpoint` event naming the message URL;
//!   responses to posted messages arrive as `message` events.
//! - `GET /api/presentations/:filename`: download a saved deck

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use pptx_engine::{normalize_filename, ErrorKind, Result, ServerError, PPTX_MIME_TYPE};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::decode_request;
use crate::mcp::PptxMcpServer;

/// Messages buffered per SSE session before posting blocks
const SESSION_BUFFER: usize = 64;

type Sessions = Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>;

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct HttpServerState {
    /// The MCP server instance
    server: Arc<PptxMcpServer>,
    /// Open SSE sessions by id
    sessions: Sessions,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: String,
}

/// Removes its session when the SSE stream is dropped
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&self.id);
        tracing::debug!(session = %self.id, "SSE session closed");
    }
}

/// Build the router
pub fn router(server: PptxMcpServer) -> Router {
    let state = HttpServerState {
        server: Arc::new(server),
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    // Configure CORS for browser clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // MCP JSON-RPC endpoint
        .route("/mcp", post(handle_mcp_request))
        // MCP SSE transport
        .route("/sse", get(handle_sse))
        .route("/messages", post(handle_message))
        // File download
        .route("/api/presentations/:filename", get(handle_get_presentation))
        // Health check
        .route("/health", get(handle_health))
        // Server info
        .route("/", get(handle_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the MCP server using HTTP transport
pub async fn run_http_server(addr: &str, server: PptxMcpServer) -> Result<()> {
    tracing::info!("Starting HTTP transport on {}", addr);

    let app = router(server);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::IoError(std::io::Error::other(e)))?;

    Ok(())
}

/// Handle MCP JSON-RPC requests
async fn handle_mcp_request(State(state): State<HttpServerState>, body: Bytes) -> Response {
    let request = match decode_request(&body) {
        Ok(request) => request,
        Err(response) => return Json(response).into_response(),
    };
    tracing::debug!("HTTP request: {}", request.method);

    match state.server.handle_request(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Open an SSE session
async fn handle_sse(
    State(state): State<HttpServerState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<String>(SESSION_BUFFER);
    state
        .sessions
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(id.clone(), tx);
    tracing::info!(session = %id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={}", id));
    let guard = SessionGuard {
        id,
        sessions: state.sessions.clone(),
    };

    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        let event = Event::default().event("message").data(message);
        Some((Ok::<_, Infallible>(event), (rx, guard)))
    });

    Sse::new(stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

/// Accept a message for an SSE session; the response is sent on the stream
async fn handle_message(
    State(state): State<HttpServerState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let sender = state
        .sessions
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&query.session_id)
        .cloned();
    let Some(sender) = sender else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Unknown session: {}", query.session_id)})),
        )
            .into_response();
    };

    let server = state.server.clone();
    tokio::spawn(async move {
        let response = match decode_request(&body) {
            Ok(request) => server.handle_request(request).await,
            Err(response) => Some(response),
        };
        let Some(response) = response else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(text) => {
                if sender.send(text).await.is_err() {
                    tracing::warn!("SSE session closed before response was sent");
                }
            }
            Err(e) => tracing::error!("Failed to serialize response: {}", e),
        }
    });

    StatusCode::ACCEPTED.into_response()
}

/// GET /api/presentations/:filename - Download a presentation
async fn handle_get_presentation(
    State(state): State<HttpServerState>,
    Path(filename): Path<String>,
) -> Response {
    match state.server.store().file_bytes(&filename).await {
        Ok(bytes) => {
            let name = normalize_filename(&filename).unwrap_or(filename);
            (
                [
                    (header::CONTENT_TYPE, PPTX_MIME_TYPE.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", name),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({"success": false, "error": e.to_string()}))).into_response()
        }
    }
}

/// Health check endpoint
async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "pptx-mcp-server"
    }))
}

/// Server info endpoint
async fn handle_info(State(state): State<HttpServerState>) -> impl IntoResponse {
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "http",
        "endpoints": {
            "mcp": "/mcp",
            "sse": "/sse",
            "messages": "/messages?session_id={session_id}",
            "presentations": "/api/presentations/{filename}",
            "health": "/health"
        }
    }))
}
