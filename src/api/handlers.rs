//! HTTP request handlers

use super::sse::{in_span, sse_stream};
use super::types::{ErrorResponse, HealthResponse};
use super::AppState;
use crate::conversation::ChatRequest;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{sse::Event, IntoResponse, Response, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use std::convert::Infallible;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/assistant", post(assistant))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Apply the request's commands and stream the resulting run
async fn assistant(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("assistant_run", %run_id);
    span.in_scope(|| {
        tracing::info!(
            commands = request.commands.len(),
            has_state = request.state.is_some(),
            "Assistant request received"
        );
        if let Some(tools) = &request.tools {
            tracing::debug!(%tools, "Ignoring client-declared tools");
        }
        if let Some(run_config) = &request.run_config {
            tracing::debug!(%run_config, "Ignoring run config");
        }
    });

    let events = state.controller.handle(
        request.commands,
        request.state.unwrap_or_default(),
        request.system,
    );

    Ok(sse_stream(in_span(events, span)))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
