//! User directory - GET /api/users, GET /api/users/:id, PUT /api/users/:id/status (Admin only)

use super::{require_role, ApiEnvelope, ApiError, AppState, Page, PageParams};
use crate::auth::models::{AccountStatus, SessionClaims, UserResponse, UserRole};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AccountStatus,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserResponse>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Query(params): Query<UserQuery>,
) -> Result<Json<ApiEnvelope<Page<UserList>>>, ApiError> {
    require_role(&claims, &[UserRole::Admin])?;

    let role = match params.user_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            UserRole::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest("Invalid user type".to_string()))?,
        ),
    };
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let (users, total) = state.user_store.list_users(role, limit, offset)?;

    Ok(Json(ApiEnvelope::new(
        "Users retrieved successfully",
        Page {
            items: UserList {
                users: users.iter().map(UserResponse::from_user).collect(),
            },
            total,
            limit,
            offset,
        },
    )))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiEnvelope<UserResponse>>, ApiError> {
    require_role(&claims, &[UserRole::Admin])?;

    let user = state
        .user_store
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

    Ok(Json(ApiEnvelope::new(
        "User retrieved successfully",
        UserResponse::from_user(&user),
    )))
}

/// Deactivated accounts can no longer log in; tokens already issued stay valid until `exp`
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(user_id): Path<i64>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<ApiEnvelope<UserResponse>>, ApiError> {
    require_role(&claims, &[UserRole::Admin])?;

    if user_id == claims.sub && payload.status != AccountStatus::Active {
        return Err(ApiError::BadRequest(
            "Administrators cannot deactivate their own account".to_string(),
        ));
    }

    if !state.user_store.set_status(user_id, payload.status)? {
        return Err(ApiError::NotFound(format!("User {} not found", user_id)));
    }
    let user = state
        .user_store
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

    info!(
        "👤 User {} set to {} by admin {}",
        user.email,
        user.status.as_str(),
        claims.sub
    );

    Ok(Json(ApiEnvelope::new(
        "User status updated",
        UserResponse::from_user(&user),
    )))
}
