// SPDX-License-Identifier: MIT

//! HTTP driver
//!
//! Start and resume calls answer with a Server-Sent-Events stream of
//! `AgentEvent`s. The stream closes when the run parks or fails.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::agent::{AgentEvent, StreamWriter};
use crate::adk::error::{DaedalusError, WorkflowError};
use crate::daedalus::workflow::checkpoint::Checkpoint;
use crate::daedalus::workflow::graph::WorkflowGraph;

type SharedGraph = Arc<WorkflowGraph>;

pub fn app(graph: SharedGraph) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/start", post(start_session))
        .route("/api/sessions/{id}/resume", post(resume_session))
        .with_state(graph)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(graph: SharedGraph, port: u16) -> Result<(), DaedalusError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(graph)).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Clone, Copy, Debug)]
enum RunKind {
    Start,
    Resume,
}

async fn create_session(
    State(graph): State<SharedGraph>,
    Json(payload): Json<MessageRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    run_stream(graph, session_id, payload.message, RunKind::Start, true)
}

async fn start_session(
    State(graph): State<SharedGraph>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    run_stream(graph, id, payload.message, RunKind::Start, false)
}

async fn resume_session(
    State(graph): State<SharedGraph>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    run_stream(graph, id, payload.message, RunKind::Resume, false)
}

async fn get_session(
    State(graph): State<SharedGraph>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match graph.session(&id).await {
        Ok(Some(checkpoint)) => (StatusCode::OK, Json(session_summary(&id, &checkpoint))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Session '{}' not found", id) })),
        ),
        Err(DaedalusError::Workflow(e @ WorkflowError::InvalidSessionId(_))) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        ),
        Err(e) => {
            log::error!("Failed to load session {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "corrupt": e.is_corruption() })),
            )
        }
    }
}

fn session_summary(session_id: &str, checkpoint: &Checkpoint) -> Value {
    json!({
        "session_id": session_id,
        "next": checkpoint.next,
        "status": checkpoint.next.status(),
        "turns": checkpoint.state.turns(),
        "scope": checkpoint.state.scope,
        "latest_user_message": checkpoint.state.latest_user_message,
        "updated_at": checkpoint.updated_at,
    })
}

fn run_stream(
    graph: SharedGraph,
    session_id: String,
    message: String,
    kind: RunKind,
    announce: bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        let writer = StreamWriter::new(tx);
        if announce {
            writer.send(AgentEvent::Session(session_id.clone())).await;
        }

        log::info!("{:?} requested for session {}", kind, session_id);
        let result = match kind {
            RunKind::Start => graph.start(&session_id, &message, &writer).await,
            RunKind::Resume => graph.resume(&session_id, &message, &writer).await,
        };

        match result {
            Ok(outcome) => log::info!(
                "Session {} {:?} after {} turns",
                session_id,
                outcome.status,
                outcome.state.turns()
            ),
            Err(e) => {
                log::error!("Session {} failed: {}", session_id, e);
                writer.send(AgentEvent::Error(e.to_string())).await;
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok(Event::default().json_data(&event).unwrap_or_else(|e| {
            log::error!("Failed to encode event {:?}: {}", event, e);
            Event::default().event("error").data(e.to_string())
        }))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}
