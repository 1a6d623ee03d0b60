//! The REST surface: `axum` routes matching the core's `index`/`search`/
//! `status`/`clear` operations one-to-one, wrapped in the shared
//! `ApiResponse` envelope.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dotmd_contracts::{ApiError, ApiResponse, IndexRequest, SearchRequest};
use dotmd_core::DotmdError;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route(dotmd_contracts::endpoints::HEALTH, get(health))
        .route(dotmd_contracts::endpoints::STATUS, get(status))
        .route(dotmd_contracts::endpoints::SEARCH, post(search))
        .route(dotmd_contracts::endpoints::INDEX, post(index))
        .route(dotmd_contracts::endpoints::CLEAR, post(clear))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(dotmd_observability::HealthReport::from_index_presence(true))
}

async fn status(State(state): State<AppState>) -> Response {
    respond(handlers::handle_status(&state).await)
}

async fn search(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Response {
    respond(handlers::handle_search(&state, request).await)
}

async fn index(State(state): State<AppState>, Json(request): Json<IndexRequest>) -> Response {
    respond(handlers::handle_index(&state, request).await)
}

async fn clear(State(state): State<AppState>) -> Response {
    respond(handlers::handle_clear(&state).await)
}

fn respond<T: serde::Serialize>(result: dotmd_core::Result<T>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(error) => {
            let status = status_for(&error);
            let body = ApiResponse::<()>::error(ApiError::new(handlers::error_code(&error), error.to_string()));
            (status, Json(body)).into_response()
        }
    }
}

fn status_for(error: &DotmdError) -> StatusCode {
    match error {
        DotmdError::IndexMissing { .. } => StatusCode::NOT_FOUND,
        DotmdError::ModelMismatch { .. } | DotmdError::Config { .. } => StatusCode::CONFLICT,
        DotmdError::Read { .. } | DotmdError::Parse { .. } => StatusCode::BAD_REQUEST,
        DotmdError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        DotmdError::IndexWrite { .. } | DotmdError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
