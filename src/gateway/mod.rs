//! HTTP gateway (Axum) for highlight scoring and saved-query lookup.
//!
//! Routes:
//! - `POST /api/highlight` scores free text against a question
//! - `GET /api/saved` lists persisted queries, most recent first
//! - `GET /api/saved/{hash}` fetches one persisted query by permalink
//! - `GET /api/health` liveness probe

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::{
    API_KEY_HEADER, HighlightRequest, SavedListResponse, SavedQueryResponse, highlight_handler,
    saved_get_handler, saved_list_handler,
};
pub use state::GatewayState;

use crate::oracle::RelevanceOracle;
use crate::pipeline::{STATUS_HEADER, STATUS_HEALTHY};
use crate::store::QueryStore;

/// Builds the gateway router on top of the provided state.
pub fn create_router_with_state<O, S>(state: GatewayState<O, S>) -> Router
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/highlight", post(highlight_handler))
        .route("/api/saved", get(saved_list_handler))
        .route("/api/saved/{hash}", get(saved_get_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(STATUS_HEALTHY));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}
