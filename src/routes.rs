// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, ai::ai_handler, applications::applications_handler,
        auth::auth_handler, chat::chat_handler, escrow::escrow_handler, jobs::jobs_handler,
        kyc::kyc_handler, ratings::ratings_handler, reports::reports_handler,
        users::users_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/jobs", jobs_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/applications",
            applications_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/ratings", ratings_handler().layer(middleware::from_fn(auth)))
        .nest("/reports", reports_handler().layer(middleware::from_fn(auth)))
        .nest("/escrow", escrow_handler().layer(middleware::from_fn(auth)))
        .nest("/chat", chat_handler().layer(middleware::from_fn(auth)))
        .nest("/ai", ai_handler().layer(middleware::from_fn(auth)))
        .nest("/kyc", kyc_handler().layer(middleware::from_fn(auth)))
        .nest("/admin", admin_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(Arc::new(AppState::for_tests()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_without_token() {
        let app = create_router(Arc::new(AppState::for_tests()));
        let response = app
            .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
