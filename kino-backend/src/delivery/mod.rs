//! HTTP delivery layer
//!
//! JSON API over the application layer plus static file serving for the
//! web frontend.

mod handler;
mod model;
pub use model::{ScreeningQuery, ScreeningView, SelectsView};

use axum::{Router, routing::get};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app::App;

/// Shared state of all handlers
#[derive(Clone)]
pub struct DeliveryState {
    pub app: Arc<App>,
    /// Screenings not refreshed within this window are hidden
    pub max_age: Duration,
}

pub fn build_router(state: DeliveryState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/health", get(handler::health_check))
        .route("/api/selects", get(handler::selects))
        .route("/api/screenings", get(handler::screenings))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
