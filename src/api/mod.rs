//! HTTP API surface.
//!
//! Thin pass-throughs over the service layer: handlers validate input,
//! resolve the account's client, call one service operation, and serialize
//! the result. AppError maps onto structured JSON error responses.

pub mod branches;
pub mod server;
pub mod sync;
pub mod workflows;

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::services::ClientCache;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for all API routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub clients: Arc<ClientCache>,
}

// ── Error handling ───────────────────────────────────────────────────────────

/// JSON error response shape for clients.
#[derive(Serialize)]
struct ApiError {
    code: String,
    message: String,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(pub AppError);

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::Authentication { .. } | AppError::AuthenticationExpired { .. } => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            AppError::GitHubApi { .. } | AppError::Network { .. } => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        (
            status,
            Json(ApiError {
                code: code.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<sqlx::Error> for ApiErr {
    fn from(err: sqlx::Error) -> Self {
        Self(AppError::from(err))
    }
}

/// Reject empty or whitespace-only required string fields.
fn require(value: &str, field: &str) -> Result<(), ApiErr> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input_field(format!("{} is required", field), field).into());
    }
    Ok(())
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the full API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .merge(sync::routes())
        .merge(workflows::routes())
        .merge(branches::routes())
}

/// GET /api/health — liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
