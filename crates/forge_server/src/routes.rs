//! HTTP routes: session start, the per-session event feed, and artifact
//! lookup.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use forge_core::{GeneratedArtifact, GenerationRequest, ProgressEvent, ProgressStream, SinkId};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/api/generation/generate-start", post(generate_start))
        .route(
            "/api/generation/generate-stream/:session_id",
            get(generate_stream),
        )
        .route("/api/code/:cid", get(get_code))
        .with_state(state)
}

async fn banner() -> Json<Value> {
    Json(json!({
        "service": "Contract Forge",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now();
    Json(json!({
        "status": "healthy",
        "timestamp": now.to_rfc3339(),
        "uptimeSeconds": state.uptime_at(now).num_seconds(),
    }))
}

/// Start request body. Fields default to empty so validation reports them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub creator: Option<String>,
}

impl From<StartRequest> for GenerationRequest {
    fn from(body: StartRequest) -> Self {
        let request = GenerationRequest::new(body.session_id, body.description, body.category);
        match body.creator.filter(|c| !c.trim().is_empty()) {
            Some(creator) => request.with_creator(creator),
            None => request,
        }
    }
}

pub async fn generate_start(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = GenerationRequest::from(body);

    let handle = state.launcher.start(request)?;
    info!(session_id = %handle.session_id(), "Generation accepted");

    Ok(Json(json!({
        "success": true,
        "accepted": true,
        "sessionId": handle.session_id(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Receiver side of one SSE connection; detaches its sink when dropped.
struct SessionFeed {
    inner: UnboundedReceiverStream<ProgressEvent>,
    stream: Arc<ProgressStream>,
    session_id: String,
    sink_id: SinkId,
}

impl Stream for SessionFeed {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for SessionFeed {
    fn drop(&mut self) {
        if self.stream.detach_sink(&self.session_id, self.sink_id) {
            debug!(session_id = %self.session_id, "Listener disconnected");
        }
    }
}

fn to_sse(event: ProgressEvent) -> Result<Event, Infallible> {
    match serde_json::to_string(&event) {
        Ok(data) => Ok(Event::default().data(data)),
        Err(e) => {
            warn!("Failed to encode progress event: {}", e);
            Ok(Event::default().comment("encode error"))
        }
    }
}

pub async fn generate_stream(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let user_id = query
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("userId required".to_string()))?;

    let (tx, rx) = mpsc::unbounded_channel();
    let stream = Arc::clone(state.stream());
    let sink_id = stream.attach(&session_id, Arc::new(tx));
    info!(session_id = %session_id, user_id = %user_id, "Listener attached");

    let feed = SessionFeed {
        inner: UnboundedReceiverStream::new(rx),
        stream,
        session_id,
        sink_id,
    };

    let mut response = Sse::new(futures::StreamExt::map(feed, to_sse))
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    Ok(response)
}

pub async fn get_code(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<GeneratedArtifact>, ApiError> {
    let artifact = state.store().get(&cid).await?;
    Ok(Json(artifact))
}
