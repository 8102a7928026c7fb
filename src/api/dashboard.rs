//! Dashboard statistics - GET /api/dashboard/stats

use super::{ApiEnvelope, ApiError, AppState};
use crate::models::DashboardStats;
use axum::{extract::State, Json};
use chrono::Utc;

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiEnvelope<DashboardStats>>, ApiError> {
    let stats = state.store.dashboard_stats(Utc::now())?;
    Ok(Json(ApiEnvelope::new(
        "Statistics retrieved successfully",
        stats,
    )))
}
