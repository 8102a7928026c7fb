//! Authentication API Endpoints
//! Mission: Provide login, registration and session introspection endpoints

use crate::api::ApiEnvelope;
use crate::auth::{
    middleware::{token_from_headers, SESSION_COOKIE},
    models::{
        AccountStatus, LoginRequest, LoginResponse, RegisterRequest, SessionClaims, User,
        UserResponse, UserRole,
    },
    token::TokenSigner,
    user_store::{NewUser, UserStore},
};
use crate::storage::is_unique_violation;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

const MIN_PASSWORD_LEN: usize = 6;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub signer: Arc<TokenSigner>,
    pub secure_cookies: bool,
}

impl AuthState {
    pub fn new(user_store: Arc<UserStore>, signer: Arc<TokenSigner>, secure_cookies: bool) -> Self {
        Self {
            user_store,
            signer,
            secure_cookies,
        }
    }

    /// Session cookie carrying `value`, with the attributes used for both setting and clearing it
    fn session_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.signer.ttl_secs()))
            .secure(self.secure_cookies)
            .build()
    }

    /// Issue a token for `user`, add its cookie to `jar` and build the response body
    fn start_session(
        &self,
        jar: CookieJar,
        user: &User,
        message: &str,
    ) -> Result<(CookieJar, Json<ApiEnvelope<LoginResponse>>), AuthApiError> {
        let token = self
            .signer
            .issue_now(&SessionClaims::for_user(user))
            .map_err(|e| {
                error!("Failed to issue session token: {}", e);
                AuthApiError::InternalError
            })?;

        let jar = jar.add(self.session_cookie(token.clone()));
        let body = ApiEnvelope::new(
            message,
            LoginResponse {
                token,
                expires_in: self.signer.ttl_secs(),
                user: UserResponse::from_user(user),
            },
        );

        Ok((jar, Json(body)))
    }
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiEnvelope<LoginResponse>>), AuthApiError> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(AuthApiError::MissingFields(
            "Missing identifier or password".to_string(),
        ));
    }

    info!("🔐 Login attempt: {}", identifier);

    let user = state
        .user_store
        .verify_credentials(identifier, &payload.password)
        .map_err(|e| {
            error!("Credential check failed: {:#}", e);
            AuthApiError::InternalError
        })?
        .ok_or_else(|| {
            warn!("❌ Failed login attempt: {}", identifier);
            AuthApiError::InvalidCredentials
        })?;

    if user.status != AccountStatus::Active {
        warn!("❌ Login refused for inactive account: {}", user.email);
        return Err(AuthApiError::AccountInactive);
    }

    if let Err(e) = state.user_store.record_login(user.id) {
        warn!("Failed to record login for {}: {:#}", user.email, e);
    }

    info!("✅ Login successful: {} ({})", user.email, user.role.as_str());

    state.start_session(jar, &user, "Login successful")
}

/// Registration endpoint - POST /api/auth/register
///
/// Anyone may register a `member` account. Staff roles need an admin session.
pub async fn register(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<ApiEnvelope<LoginResponse>>), AuthApiError> {
    let missing: Vec<&str> = [
        ("email", payload.email.trim()),
        ("password", payload.password.as_str()),
        ("full_name", payload.full_name.trim()),
        ("user_type", payload.user_type.trim()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(AuthApiError::MissingFields(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let email = payload.email.trim();
    if !is_valid_email(email) {
        return Err(AuthApiError::InvalidEmail);
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthApiError::WeakPassword);
    }
    let role = UserRole::from_str(&payload.user_type).ok_or(AuthApiError::InvalidUserType)?;

    if role != UserRole::Member {
        let is_admin = token_from_headers(&headers)
            .and_then(|token| state.signer.verify_now::<SessionClaims>(&token).ok())
            .is_some_and(|claims| claims.role == UserRole::Admin);
        if !is_admin {
            warn!("❌ Refused self-registration as {}", role.as_str());
            return Err(AuthApiError::Forbidden);
        }
    }

    let exists = state.user_store.email_exists(email).map_err(|e| {
        error!("Email check failed: {:#}", e);
        AuthApiError::InternalError
    })?;
    if exists {
        return Err(AuthApiError::UserAlreadyExists);
    }

    let user = state
        .user_store
        .create_user(&NewUser {
            email: email.to_string(),
            password: payload.password.clone(),
            full_name: payload.full_name.trim().to_string(),
            role,
            staff_no: payload.staff_no.clone(),
        })
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthApiError::UserAlreadyExists
            } else {
                error!("Failed to create user: {:#}", e);
                AuthApiError::InternalError
            }
        })?;

    state.start_session(jar, &user, "Registration successful")
}

/// Logout endpoint - POST /api/auth/logout
///
/// Tokens are stateless; this only clears the browser cookie when the request carried one.
pub async fn logout(State(state): State<AuthState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(state.session_cookie(String::new()));
    (
        jar,
        Json(json!({ "success": true, "message": "Logged out" })),
    )
}

/// Get current session - GET /api/auth/me
/// Answered from the token claims alone, no database lookup
pub async fn get_current_user(
    Extension(claims): Extension<SessionClaims>,
) -> Json<ApiEnvelope<SessionClaims>> {
    Json(ApiEnvelope::new("Session is valid", claims))
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    MissingFields(String),
    InvalidEmail,
    WeakPassword,
    InvalidUserType,
    InvalidCredentials,
    AccountInactive,
    Forbidden,
    UserAlreadyExists,
    InternalError,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::MissingFields(message) => (StatusCode::BAD_REQUEST, message),
            AuthApiError::InvalidEmail => {
                (StatusCode::BAD_REQUEST, "Invalid email format".to_string())
            }
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                format!(
                    "Password must be at least {} characters long",
                    MIN_PASSWORD_LEN
                ),
            ),
            AuthApiError::InvalidUserType => {
                (StatusCode::BAD_REQUEST, "Invalid user type".to_string())
            }
            AuthApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AuthApiError::AccountInactive => {
                (StatusCode::FORBIDDEN, "Account is not active".to_string())
            }
            AuthApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Only administrators can create staff accounts".to_string(),
            ),
            AuthApiError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            AuthApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}
