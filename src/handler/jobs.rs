use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::jobdb::JobExt,
    dtos::{jobdtos::*, userdtos::Response},
    error::HttpError,
    middleware::{role_check, SessionAuth},
    models::{
        jobmodel::{EscrowStatus, Job},
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Employer])
            })),
        )
        .route("/", get(list_jobs))
        .route("/:job_id", get(get_job))
        .route("/:job_id", delete(delete_job))
        .route("/:job_id/status", put(update_job_status))
}

/// Loads a job or 404s.
pub(crate) async fn load_job(app_state: &AppState, job_id: Uuid) -> Result<Job, HttpError> {
    app_state
        .db_client
        .get_job(job_id)
        .await
        .map_err(|e| HttpError::internal("Job lookup failed", e))?
        .ok_or_else(|| ServiceError::JobNotFound(job_id).into())
}

fn ensure_owner_or_admin(job: &Job, user: &User) -> Result<(), ServiceError> {
    if job.employer_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::UnauthorizedJobAccess(user.id, job.id))
    }
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.latitude.is_some() != body.longitude.is_some() {
        return Err(HttpError::bad_request(
            "Latitude and longitude must be provided together",
        ));
    }

    let job = app_state
        .db_client
        .create_job(session.user.id, body.into_new_job())
        .await
        .map_err(|e| HttpError::internal("Failed to create job", e))?;

    tracing::info!("Job {} posted by {}", job.id, session.user.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": { "job": JobResponseDto::from_job(job, None) }
        })),
    ))
}

pub async fn list_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<JobQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if query.lat.is_some() != query.lng.is_some() {
        return Err(HttpError::bad_request("lat and lng must be provided together"));
    }

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);

    let jobs = app_state
        .db_client
        .search_jobs(&query.to_search(), page, limit)
        .await
        .map_err(|e| HttpError::internal("Job search failed", e))?;

    let origin = query.origin();
    let jobs: Vec<JobResponseDto> = jobs
        .into_iter()
        .map(|job| JobResponseDto::from_job(job, origin))
        .collect();

    Ok(Json(JobListResponseDto {
        status: "success",
        results: jobs.len(),
        jobs,
        page,
    }))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = load_job(&app_state, job_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "job": JobResponseDto::from_job(job, None) }
    })))
}

pub async fn update_job_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<UpdateJobStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = load_job(&app_state, job_id).await?;
    ensure_owner_or_admin(&job, &session.user)?;

    if !job.status.can_transition_to(body.status) {
        return Err(ServiceError::InvalidJobStatus(job.id, job.status).into());
    }

    let mut tx = app_state
        .db_client
        .pool
        .begin()
        .await
        .map_err(|e| HttpError::internal("Failed to start transaction", e))?;

    let job = app_state
        .db_client
        .update_job_status(&mut tx, job.id, body.status)
        .await
        .map_err(|e| HttpError::internal("Failed to update job status", e))?;

    tx.commit()
        .await
        .map_err(|e| HttpError::internal("Failed to commit job status", e))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "job": JobResponseDto::from_job(job, None) }
    })))
}

pub async fn delete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = load_job(&app_state, job_id).await?;

    if job.employer_id != session.user.id {
        return Err(ServiceError::UnauthorizedJobAccess(session.user.id, job.id).into());
    }

    let engaged = app_state
        .db_client
        .get_engaged_application(job.id)
        .await
        .map_err(|e| HttpError::internal("Application lookup failed", e))?;
    if engaged.is_some() {
        return Err(HttpError::conflict(
            "A job with an accepted application cannot be deleted",
        ));
    }
    if job.escrow_status == EscrowStatus::Held {
        return Err(HttpError::conflict(
            "Refund the held escrow before deleting this job",
        ));
    }

    app_state
        .db_client
        .delete_job(job.id)
        .await
        .map_err(|e| HttpError::internal("Failed to delete job", e))?;

    tracing::info!("Job {} deleted by {}", job.id, session.user.id);

    Ok(Json(Response {
        status: "success",
        message: "Job deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::test_support::{mount, send_json},
        models::{jobmodel::sample_job, usermodel::sample_user},
    };
    use axum::http::Method;
    use serde_json::json;

    fn job_body() -> serde_json::Value {
        json!({
            "title": "Fix kitchen sink",
            "description": "Leaking pipe under the kitchen sink needs replacing",
            "category": "plumbing",
            "skills": ["plumbing"],
            "pay_amount": 800,
            "pay_type": "fixed",
            "city": "Pune"
        })
    }

    #[tokio::test]
    async fn test_workers_cannot_post_jobs() {
        let app = mount(jobs_handler(), Some(sample_user(UserRole::Worker)));
        let (status, body) = send_json(app, Method::POST, "/", job_body()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn test_create_job_validates_input() {
        let app = mount(jobs_handler(), Some(sample_user(UserRole::Employer)));
        let mut body = job_body();
        body["pay_amount"] = json!(0);

        let (status, _) = send_json(app, Method::POST, "/", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_owner_or_admin() {
        let employer = sample_user(UserRole::Employer);
        let admin = sample_user(UserRole::Admin);
        let other = sample_user(UserRole::Employer);
        let job = sample_job(employer.id);

        assert!(ensure_owner_or_admin(&job, &employer).is_ok());
        assert!(ensure_owner_or_admin(&job, &admin).is_ok());
        assert!(ensure_owner_or_admin(&job, &other).is_err());
    }
}
