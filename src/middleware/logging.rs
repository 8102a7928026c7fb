//! Request logging middleware.

use crate::auth::models::SessionClaims;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Log each request with its outcome and, past the auth gate, the calling user.
///
/// Health checks are skipped. 5xx responses log at WARN.
pub async fn request_logging(request: Request, next: Next) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let caller = response.extensions().get::<SessionClaims>();
    let user_id = caller.map(|c| c.sub);
    let role = caller.map(|c| c.role.as_str());

    if response.status().is_server_error() {
        warn!(%method, %path, status, latency_ms, user_id, role, "Request failed");
    } else {
        info!(%method, %path, status, latency_ms, user_id, role, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{AccountStatus, UserRole};
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_response_passes_through_unchanged() {
        let app = Router::new()
            .route(
                "/api/members",
                get(|| async {
                    let mut response = (StatusCode::CREATED, "ok").into_response();
                    response.extensions_mut().insert(SessionClaims {
                        sub: 3,
                        email: "admin@coop.test".to_string(),
                        role: UserRole::Admin,
                        status: AccountStatus::Active,
                    });
                    response
                }),
            )
            .route("/health", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_logging));

        for (uri, status) in [("/api/members", StatusCode::CREATED), ("/health", StatusCode::OK)] {
            let response = app
                .clone()
                .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), status);
        }
    }
}
