use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::{trustdb::TrustExt, userdb::UserExt},
    dtos::trustdtos::*,
    error::HttpError,
    middleware::SessionAuth,
    service::error::ServiceError,
    AppState,
};

pub fn reports_handler() -> Router {
    Router::new()
        .route("/", post(create_report))
        .route("/", get(get_reports))
}

pub async fn create_report(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<CreateReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.reported_user_id == session.user.id {
        return Err(HttpError::bad_request("You cannot report yourself"));
    }

    app_state
        .db_client
        .get_user(Some(body.reported_user_id), None, None)
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?
        .ok_or(ServiceError::UserNotFound(body.reported_user_id))?;

    let report = app_state
        .db_client
        .create_report(
            session.user.id,
            body.reported_user_id,
            body.job_id,
            body.reason.trim().to_string(),
            body.description.trim().to_string(),
        )
        .await
        .map_err(|e| HttpError::internal("Failed to file report", e))?;

    tracing::info!(
        "Report {} filed by {} against {}",
        report.id,
        report.reporter_id,
        report.reported_user_id
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": { "report": report }
        })),
    ))
}

pub async fn get_reports(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Query(query): Query<ReportQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let reports = if session.user.is_admin() {
        app_state.db_client.get_reports(query.status).await
    } else {
        app_state.db_client.get_reports_by_reporter(session.user.id).await
    }
    .map_err(|e| HttpError::internal("Failed to load reports", e))?;

    Ok(Json(ReportListResponseDto {
        status: "success",
        results: reports.len(),
        reports,
    }))
}
