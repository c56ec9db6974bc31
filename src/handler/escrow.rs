use std::sync::Arc;

use axum::{
    extract::Query,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};

use super::jobs::load_job;
use crate::{
    db::jobdb::JobExt,
    dtos::jobdtos::*,
    error::HttpError,
    middleware::SessionAuth,
    service::error::ServiceError,
    utils::currency::format_paise_as_rupees,
    AppState,
};

pub fn escrow_handler() -> Router {
    Router::new()
        .route("/", post(escrow_action))
        .route("/", get(get_escrow_transactions))
}

pub async fn escrow_action(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<EscrowActionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .escrow_service
        .apply(body.job_id, body.action, &session.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "job": JobResponseDto::from_job(outcome.job, None),
            "transaction": outcome.transaction,
            "amount_display": format_paise_as_rupees(outcome.transaction.amount),
        }
    })))
}

pub async fn get_escrow_transactions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Query(query): Query<EscrowQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = load_job(&app_state, query.job_id).await?;
    let user = &session.user;

    if job.employer_id != user.id && !user.is_admin() {
        let engaged = app_state
            .db_client
            .get_engaged_application(job.id)
            .await
            .map_err(|e| HttpError::internal("Application lookup failed", e))?;

        if engaged.map_or(true, |a| a.worker_id != user.id) {
            return Err(ServiceError::UnauthorizedJobAccess(user.id, job.id).into());
        }
    }

    let transactions = app_state
        .db_client
        .get_escrow_transactions(job.id)
        .await
        .map_err(|e| HttpError::internal("Failed to load escrow transactions", e))?;

    Ok(Json(EscrowTransactionsResponseDto {
        status: "success",
        results: transactions.len(),
        transactions,
    }))
}
