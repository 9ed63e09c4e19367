//! HTTP API
//!
//! `POST /assistant` streams a run as server-sent events, `GET /health`
//! reports liveness.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::config::Settings;
use crate::conversation::Controller;
use crate::runtime::{LlmClient, SharedLoop, ToolExecutor};
use axum::http::HeaderValue;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Controller<Arc<dyn LlmClient>, Arc<dyn ToolExecutor>>,
}

impl AppState {
    pub fn new(engine: SharedLoop) -> Self {
        Self {
            controller: Controller::new(engine),
        }
    }
}

/// CORS policy for the configured origins
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if settings.cors_allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
