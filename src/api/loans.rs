//! Loan endpoints - GET/POST /api/loans

use super::{require_role, ApiEnvelope, ApiError, AppState, Page, PageParams};
use crate::auth::models::{SessionClaims, UserRole};
use crate::models::{Loan, LoanFilter, LoanStatus, NewLoan};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoanQuery {
    pub status: Option<String>,
    pub member_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoanList {
    pub loans: Vec<Loan>,
}

pub async fn list_loans(
    State(state): State<AppState>,
    Query(params): Query<LoanQuery>,
) -> Result<Json<ApiEnvelope<Page<LoanList>>>, ApiError> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            LoanStatus::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest("Invalid loan status".to_string()))?,
        ),
    };
    let filter = LoanFilter {
        status,
        member_id: params.member_id,
    };
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let (loans, total) = state.store.list_loans(filter, limit, offset)?;

    Ok(Json(ApiEnvelope::new(
        "Loans retrieved successfully",
        Page {
            items: LoanList { loans },
            total,
            limit,
            offset,
        },
    )))
}

/// Record a loan (Admin or loan officer)
pub async fn create_loan(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(payload): Json<NewLoan>,
) -> Result<(StatusCode, Json<ApiEnvelope<Loan>>), ApiError> {
    require_role(&claims, &[UserRole::Admin, UserRole::LoanOfficer])?;
    payload
        .validate()
        .map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    let loan = state
        .store
        .create_loan(&payload)?
        .ok_or_else(|| ApiError::NotFound(format!("Member {} not found", payload.member_id)))?;

    info!(
        "Loan {} recorded by user {} ({})",
        loan.loan_id,
        claims.sub,
        claims.role.as_str()
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::new("Loan recorded", loan)),
    ))
}
