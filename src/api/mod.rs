//! HTTP API: response envelope, shared state, errors and the cooperative endpoints

pub mod dashboard;
pub mod loans;
pub mod members;
pub mod routes;
pub mod users;

pub use routes::build_router;

use crate::auth::{
    models::{SessionClaims, UserRole},
    user_store::UserStore,
};
use crate::storage::CoopStore;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_PAGE_LIMIT: i64 = 100;
const MAX_PAGE_LIMIT: i64 = 500;

/// Shared application state for the cooperative endpoints
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CoopStore>,
    pub user_store: Arc<UserStore>,
}

/// Success envelope: `{"success": true, "message": ..., "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// One page of a listing plus the total number of matching rows
#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub items: T,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// `limit`/`offset` query parameters shared by every listing
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Limit defaults to 100 and is clamped to 1..=500; offset is never negative
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Fail with 403 unless the caller holds one of `allowed`
pub fn require_role(claims: &SessionClaims, allowed: &[UserRole]) -> Result<(), ApiError> {
    if claims.has_role(allowed) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Database(anyhow::Error),
    BadRequest(String),
    Forbidden,
    NotFound(String),
    Conflict(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Unauthorized access".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}
