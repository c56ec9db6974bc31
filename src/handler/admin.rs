use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{trustdb::TrustExt, userdb::UserExt},
    dtos::{trustdtos::*, userdtos::{RequestQueryDto, UserListResponseDto}},
    error::HttpError,
    middleware::{role_check, SessionAuth},
    models::{trustmodel::ReportStatus, usermodel::UserRole},
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/penalize", post(penalize_user))
        .route("/reports/:report_id", put(resolve_report))
        .route("/users", get(get_users))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
}

pub async fn penalize_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<PenalizeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.user_id == session.user.id {
        return Err(HttpError::bad_request("You cannot penalize yourself"));
    }

    let user = app_state
        .trust_service
        .penalize(body.user_id, body.penalty, body.reason.trim().to_string())
        .await?;

    tracing::info!("Admin {} penalized {}", session.user.id, user.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "user_id": user.id,
            "trust_score": user.trust_score,
            "trust_level": user.trust_level,
            "suspended": user.suspended,
        }
    })))
}

pub async fn resolve_report(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(report_id): Path<Uuid>,
    Json(body): Json<ResolveReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.status == ReportStatus::Pending {
        return Err(HttpError::bad_request("Status must be resolved or dismissed"));
    }

    let report = app_state
        .db_client
        .get_report(report_id)
        .await
        .map_err(|e| HttpError::internal("Report lookup failed", e))?
        .ok_or_else(|| HttpError::not_found("Report not found"))?;

    if report.status != ReportStatus::Pending {
        return Err(HttpError::conflict("This report has already been handled"));
    }

    let report = app_state
        .db_client
        .resolve_report(
            report.id,
            body.status,
            body.resolution.trim().to_string(),
            session.user.id,
        )
        .await
        .map_err(|e| HttpError::internal("Failed to resolve report", e))?;

    // Resolved reports count as complaints.
    if report.status == ReportStatus::Resolved {
        if let Err(e) = app_state.trust_service.recompute(report.reported_user_id).await {
            tracing::error!(
                "Failed to recompute trust for {}: {}",
                report.reported_user_id,
                e
            );
        }
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "report": report }
    })))
}

pub async fn get_users(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);

    let users = app_state
        .db_client
        .get_users(page, limit)
        .await
        .map_err(|e| HttpError::internal("Failed to load users", e))?;
    let user_count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(|e| HttpError::internal("Failed to count users", e))?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users,
        results: user_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::test_support::{mount, send_json},
        models::usermodel::sample_user,
    };
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let app = mount(admin_handler(), Some(sample_user(UserRole::Employer)));
        let (status, body) = send_json(
            app,
            Method::POST,
            "/penalize",
            json!({ "user_id": Uuid::new_v4(), "penalty": 10, "reason": "fake reviews" }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You are not allowed to perform this action");
    }

    #[tokio::test]
    async fn test_penalty_must_be_positive() {
        let app = mount(admin_handler(), Some(sample_user(UserRole::Admin)));
        let (status, _) = send_json(
            app,
            Method::POST,
            "/penalize",
            json!({ "user_id": Uuid::new_v4(), "penalty": -5, "reason": "fake reviews" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_cannot_be_reset_to_pending() {
        let app = mount(admin_handler(), Some(sample_user(UserRole::Admin)));
        let uri = format!("/reports/{}", Uuid::new_v4());
        let (status, body) = send_json(
            app,
            Method::PUT,
            &uri,
            json!({ "status": "pending", "resolution": "reopening" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Status must be resolved or dismissed");
    }
}
