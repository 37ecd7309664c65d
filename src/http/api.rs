//! Inspection API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::capture::{Exchange, Filter, FilterParams};
use crate::http::server::AppState;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MethodNotAllowed(_) => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
                "Method not allowed\n",
            )
                .into_response(),
        }
    }
}

#[derive(Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub status: &'static str,
    pub target: String,
    pub exchanges: usize,
    pub capacity: usize,
    pub observers: Option<usize>,
}

/// `GET /api/logs?url=&method=&status_code=`
pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Json<Vec<Arc<Exchange>>> {
    let filter = Filter::from(params);
    Json(state.store.list(&filter))
}

/// `POST /api/logs/clear`
pub async fn clear_logs(
    State(state): State<AppState>,
    method: Method,
) -> Result<&'static str, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed(method));
    }
    state.store.clear();
    Ok("Logs cleared\n")
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        target: state.forwarder.target().to_string(),
        exchanges: state.store.len(),
        capacity: state.store.capacity(),
        observers: state.hub.observer_count().await,
    })
}
