//! HTTP handlers for the scan API.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::stream::StreamExt;

use super::api::{StartRequest, StartResponse, StopResponse};
use super::error::ApiError;
use crate::scan::{ScanEvent, ScanRegistry, ScanStatus};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry of scan sessions.
    pub registry: Arc<ScanRegistry>,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(registry: Arc<ScanRegistry>) -> Self {
        Self { registry }
    }
}

/// Render one scan event as an SSE block.
#[must_use]
pub fn to_sse_event(event: &ScanEvent) -> Event {
    let sse = match event.event_name() {
        Some(name) => Event::default().event(name),
        None => Event::default(),
    };
    sse.data(event.data())
}

/// POST /start - Start a scan session.
pub async fn post_start(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StartResponse>, ApiError> {
    let request = StartRequest::from_body(&body);
    let id = state
        .registry
        .start_scan(request.target(), request.skip())
        .await?;

    Ok(Json(StartResponse {
        scan_id: id.to_string(),
    }))
}

/// GET /stream/{id} - SSE stream of a session's output and progress.
pub async fn get_stream(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let events = state.registry.stream_events(&scan_id).await?;
    let stream = events.map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream))
}

/// POST /stop/{id} - Ask a session's scanner to stop.
pub async fn post_stop(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<StopResponse>, ApiError> {
    state.registry.stop_scan(&scan_id).await?;
    Ok(Json(StopResponse::stopping()))
}

/// GET /status/{id} - Current progress and completion of a session.
pub async fn get_status(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<ScanStatus>, ApiError> {
    let status = state.registry.status(&scan_id).await?;
    Ok(Json(status))
}
