use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use super::jobs::load_job;
use crate::{
    db::{db::is_unique_violation, jobdb::JobExt},
    dtos::jobdtos::*,
    error::HttpError,
    middleware::{role_check, SessionAuth},
    models::{
        jobmodel::{Application, ApplicationStatus, Job, JobStatus},
        usermodel::{User, UserRole},
    },
    service::{error::ServiceError, matching_service::compute_match_score},
    AppState,
};

pub fn applications_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(apply_to_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Worker])
            })),
        )
        .route("/", get(list_applications))
        .route("/:application_id/status", put(update_application_status))
}

/// Who may move an application into `next`: the worker may only withdraw,
/// the job owner decides everything else.
pub fn authorize_application_update(
    application: &Application,
    job: &Job,
    actor: &User,
    next: ApplicationStatus,
) -> Result<(), ServiceError> {
    let allowed = if actor.id == application.worker_id {
        next == ApplicationStatus::Withdrawn
    } else if actor.id == job.employer_id {
        matches!(
            next,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Completed
        )
    } else {
        false
    };

    if !allowed {
        return Err(ServiceError::Forbidden(
            "You cannot change this application to that status".to_string(),
        ));
    }

    if !application.status.can_transition_to(next) {
        return Err(ServiceError::Validation(format!(
            "Application cannot move from {:?} to {:?}",
            application.status, next
        )));
    }

    Ok(())
}

/// Job-level preconditions for moving an application to `next`.
pub fn check_job_allows(
    job: &Job,
    has_engaged_worker: bool,
    next: ApplicationStatus,
) -> Result<(), ServiceError> {
    match next {
        ApplicationStatus::Accepted => {
            if job.status != JobStatus::Active {
                return Err(ServiceError::InvalidJobStatus(job.id, job.status));
            }
            if has_engaged_worker {
                return Err(ServiceError::Conflict(
                    "This job already has an accepted worker".to_string(),
                ));
            }
        }
        ApplicationStatus::Completed if job.status != JobStatus::InProgress => {
            return Err(ServiceError::InvalidJobStatus(job.id, job.status));
        }
        _ => {}
    }

    Ok(())
}

/// Job status that follows from an application moving from `previous` to `next`.
pub fn job_status_after(
    job: &Job,
    previous: ApplicationStatus,
    next: ApplicationStatus,
) -> Option<JobStatus> {
    match next {
        ApplicationStatus::Accepted => Some(JobStatus::InProgress),
        ApplicationStatus::Completed => Some(JobStatus::Completed),
        ApplicationStatus::Withdrawn
            if previous == ApplicationStatus::Accepted && job.status == JobStatus::InProgress =>
        {
            Some(JobStatus::Active)
        }
        _ => None,
    }
}

pub async fn apply_to_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<CreateApplicationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = load_job(&app_state, body.job_id).await?;
    if job.status != JobStatus::Active {
        return Err(ServiceError::InvalidJobStatus(job.id, job.status).into());
    }

    let match_score = compute_match_score(&job, &session.user);
    let cover_note = body
        .cover_note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let application = app_state
        .db_client
        .create_application(job.id, session.user.id, cover_note, match_score)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HttpError::conflict("You have already applied to this job")
            } else {
                HttpError::internal("Failed to create application", e)
            }
        })?;

    tracing::info!(
        "Worker {} applied to job {} (match {})",
        session.user.id,
        job.id,
        match_score
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": { "application": application }
        })),
    ))
}

pub async fn list_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Query(query): Query<ApplicationQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = &session.user;

    let applications = match (user.role, query.job_id) {
        (UserRole::Worker, _) => app_state
            .db_client
            .get_worker_applications(user.id)
            .await
            .map_err(|e| HttpError::internal("Failed to load applications", e))?,
        (_, Some(job_id)) => {
            let job = load_job(&app_state, job_id).await?;
            if job.employer_id != user.id && !user.is_admin() {
                return Err(ServiceError::UnauthorizedJobAccess(user.id, job.id).into());
            }
            app_state
                .db_client
                .get_job_applications(job.id)
                .await
                .map_err(|e| HttpError::internal("Failed to load applications", e))?
        }
        (_, None) => return Err(HttpError::bad_request("job_id is required")),
    };

    Ok(Json(ApplicationListResponseDto {
        status: "success",
        results: applications.len(),
        applications,
    }))
}

pub async fn update_application_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<UpdateApplicationStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .db_client
        .get_application(application_id)
        .await
        .map_err(|e| HttpError::internal("Application lookup failed", e))?
        .ok_or(ServiceError::ApplicationNotFound(application_id))?;

    let job = load_job(&app_state, application.job_id).await?;
    authorize_application_update(&application, &job, &session.user, body.status)?;

    let mut tx = app_state
        .db_client
        .pool
        .begin()
        .await
        .map_err(|e| HttpError::internal("Failed to start transaction", e))?;

    // Accepts, completions and escrow actions on one job run one at a time.
    let job = app_state
        .db_client
        .lock_job(&mut tx, job.id)
        .await
        .map_err(|e| HttpError::internal("Job lookup failed", e))?
        .ok_or(ServiceError::JobNotFound(job.id))?;

    let has_engaged = if body.status == ApplicationStatus::Accepted {
        app_state
            .db_client
            .get_engaged_application_tx(&mut tx, job.id)
            .await
            .map_err(|e| HttpError::internal("Application lookup failed", e))?
            .is_some()
    } else {
        false
    };
    check_job_allows(&job, has_engaged, body.status)?;

    let previous_status = application.status;
    let application = app_state
        .db_client
        .update_application_status(&mut tx, application.id, previous_status, body.status)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HttpError::conflict("This job already has an accepted worker")
            } else {
                HttpError::internal("Failed to update application", e)
            }
        })?
        .ok_or_else(|| HttpError::conflict("This application was changed by another request"))?;

    let job = match job_status_after(&job, previous_status, body.status) {
        Some(next) => app_state
            .db_client
            .update_job_status(&mut tx, job.id, next)
            .await
            .map_err(|e| HttpError::internal("Failed to update job status", e))?,
        None => job,
    };

    tx.commit()
        .await
        .map_err(|e| HttpError::internal("Failed to commit application update", e))?;

    if body.status == ApplicationStatus::Completed {
        for user_id in [application.worker_id, job.employer_id] {
            if let Err(e) = app_state.trust_service.recompute(user_id).await {
                tracing::error!("Failed to recompute trust for {}: {}", user_id, e);
            }
        }
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "application": application, "job": job }
    })))
}
