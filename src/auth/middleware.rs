//! Authentication Middleware
//! Mission: Let a request reach a protected handler only with a valid, unexpired token

use crate::auth::{
    models::SessionClaims,
    token::{TokenError, TokenSigner},
};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Cookie the login endpoint sets for browser clients
pub const SESSION_COOKIE: &str = "sessionToken";

/// Auth middleware that validates session tokens
pub async fn auth_middleware(
    State(signer): State<Arc<TokenSigner>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_headers(req.headers()).ok_or(AuthError::MissingToken)?;

    let claims: SessionClaims = signer.verify_now(&token).map_err(|e| {
        debug!(path = %req.uri().path(), error = %e, "Rejected session token");
        AuthError::from(e)
    })?;

    // Handlers read the claims through `Extension<SessionClaims>`
    req.extensions_mut().insert(claims.clone());

    let mut response = next.run(req).await;
    // Outer layers (request logging) see who made the call
    response.extensions_mut().insert(claims);
    Ok(response)
}

/// Find the session token: `Authorization` header first, then the session cookie.
///
/// The `Bearer` scheme prefix is optional and matched case-insensitively.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        return strip_bearer(value).map(str::to_string);
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn strip_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

/// Auth error types
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenExpired,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::TokenExpired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "No token provided",
            AuthError::InvalidToken => "Invalid token",
            AuthError::TokenExpired => "Token expired",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}
