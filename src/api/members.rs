//! Member endpoints - GET/POST /api/members, GET /api/members/:id

use super::{require_role, ApiEnvelope, ApiError, AppState, Page, PageParams};
use crate::auth::models::{SessionClaims, UserRole};
use crate::models::{Member, MemberStatus, NewMember};
use crate::storage::is_unique_violation;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MemberList {
    pub members: Vec<Member>,
}

/// Any signed-in user may browse the member register
pub async fn list_members(
    State(state): State<AppState>,
    Query(params): Query<MemberQuery>,
) -> Result<Json<ApiEnvelope<Page<MemberList>>>, ApiError> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            MemberStatus::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest("Invalid member status".to_string()))?,
        ),
    };
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let (members, total) = state.store.list_members(status, limit, offset)?;

    Ok(Json(ApiEnvelope::new(
        "Members retrieved successfully",
        Page {
            items: MemberList { members },
            total,
            limit,
            offset,
        },
    )))
}

pub async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> Result<Json<ApiEnvelope<Member>>, ApiError> {
    let member = state
        .store
        .get_member(member_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Member {} not found", member_id)))?;

    Ok(Json(ApiEnvelope::new("Member retrieved successfully", member)))
}

/// Register a member (Admin only)
pub async fn create_member(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(payload): Json<NewMember>,
) -> Result<(StatusCode, Json<ApiEnvelope<Member>>), ApiError> {
    require_role(&claims, &[UserRole::Admin])?;

    if payload.member_number.trim().is_empty() || payload.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required fields: member_number, full_name".to_string(),
        ));
    }

    let member = state.store.create_member(&payload).map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Member number already registered".to_string())
        } else {
            ApiError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::new("Member registered", member)),
    ))
}
