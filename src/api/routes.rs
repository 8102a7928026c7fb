//! Router assembly: public, auth and token-protected routes

use super::{dashboard, health_check, loans, members, users, AppState};
use crate::auth::{api as auth_api, auth_middleware, AuthState};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full API router.
///
/// Every route under `protected` passes through the session token gate first.
pub fn build_router(auth_state: AuthState, app_state: AppState, cors: CorsLayer) -> Router {
    let signer = auth_state.signer.clone();

    let auth_router = Router::new()
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/logout", post(auth_api::logout))
        .with_state(auth_state);

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user))
        .route("/api/users/:id/status", put(users::update_user_status))
        .route(
            "/api/members",
            get(members::list_members).post(members::create_member),
        )
        .route("/api/members/:id", get(members::get_member))
        .route(
            "/api/loans",
            get(loans::list_loans).post(loans::create_loan),
        )
        .route("/api/dashboard/stats", get(dashboard::get_stats))
        .route_layer(middleware::from_fn_with_state(signer, auth_middleware))
        .with_state(app_state);

    let public_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(auth_router)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
