use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use super::jobs::load_job;
use crate::{
    db::{db::is_unique_violation, jobdb::JobExt, trustdb::TrustExt},
    dtos::trustdtos::*,
    error::HttpError,
    middleware::SessionAuth,
    models::jobmodel::{Job, JobStatus},
    service::error::ServiceError,
    AppState,
};

pub fn ratings_handler() -> Router {
    Router::new()
        .route("/", post(create_rating))
        .route("/", get(get_ratings))
}

/// Only the employer and the engaged worker of a completed job rate each other.
pub fn check_rating_parties(
    job: &Job,
    worker_id: Option<Uuid>,
    rater_id: Uuid,
    ratee_id: Uuid,
) -> Result<(), ServiceError> {
    if rater_id == ratee_id {
        return Err(ServiceError::SelfRating);
    }
    if job.status != JobStatus::Completed {
        return Err(ServiceError::InvalidJobStatus(job.id, job.status));
    }

    let worker_id = worker_id.ok_or_else(|| {
        ServiceError::Forbidden("Only participants of this job can rate each other".to_string())
    })?;

    let employer_rates_worker = rater_id == job.employer_id && ratee_id == worker_id;
    let worker_rates_employer = rater_id == worker_id && ratee_id == job.employer_id;

    if employer_rates_worker || worker_rates_employer {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Only participants of this job can rate each other".to_string(),
        ))
    }
}

pub async fn create_rating(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<CreateRatingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let rater_id = session.user.id;
    if body.ratee_id == rater_id {
        return Err(ServiceError::SelfRating.into());
    }

    let job = load_job(&app_state, body.job_id).await?;
    let worker_id = app_state
        .db_client
        .get_engaged_application(job.id)
        .await
        .map_err(|e| HttpError::internal("Application lookup failed", e))?
        .map(|a| a.worker_id);

    check_rating_parties(&job, worker_id, rater_id, body.ratee_id)?;

    let exists = app_state
        .db_client
        .rating_exists(rater_id, body.ratee_id, job.id)
        .await
        .map_err(|e| HttpError::internal("Rating lookup failed", e))?;
    if exists {
        return Err(ServiceError::DuplicateRating.into());
    }

    let comment = body
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let rating = app_state
        .db_client
        .create_rating(job.id, rater_id, body.ratee_id, body.score, comment)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HttpError::from(ServiceError::DuplicateRating)
            } else {
                HttpError::internal("Failed to save rating", e)
            }
        })?;

    let ratee = match app_state.trust_service.recompute(body.ratee_id).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::error!("Failed to recompute trust for {}: {}", body.ratee_id, e);
            None
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "rating": rating,
                "ratee_trust_score": ratee.as_ref().map(|u| u.trust_score),
                "ratee_trust_level": ratee.as_ref().map(|u| u.trust_level),
            }
        })),
    ))
}

pub async fn get_ratings(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<RatingQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ratings = app_state
        .db_client
        .get_ratings_for_user(query.user_id)
        .await
        .map_err(|e| HttpError::internal("Failed to load ratings", e))?;

    Ok(Json(RatingListResponseDto::new(ratings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::test_support::{mount, send_json},
        models::{
            jobmodel::sample_job,
            usermodel::{sample_user, UserRole},
        },
    };
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_self_rating_is_rejected() {
        let user = sample_user(UserRole::Worker);
        let user_id = user.id;
        let app = mount(ratings_handler(), Some(user));

        let (status, body) = send_json(
            app,
            Method::POST,
            "/",
            json!({ "job_id": Uuid::new_v4(), "ratee_id": user_id, "score": 5 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You cannot rate yourself");
    }

    #[tokio::test]
    async fn test_score_out_of_range() {
        let app = mount(ratings_handler(), Some(sample_user(UserRole::Employer)));
        let (status, _) = send_json(
            app,
            Method::POST,
            "/",
            json!({ "job_id": Uuid::new_v4(), "ratee_id": Uuid::new_v4(), "score": 9 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rating_parties() {
        let employer = Uuid::new_v4();
        let worker = Uuid::new_v4();
        let mut job = sample_job(employer);

        assert!(matches!(
            check_rating_parties(&job, Some(worker), employer, worker),
            Err(ServiceError::InvalidJobStatus(_, _))
        ));

        job.status = JobStatus::Completed;
        assert!(check_rating_parties(&job, Some(worker), employer, worker).is_ok());
        assert!(check_rating_parties(&job, Some(worker), worker, employer).is_ok());
        assert!(check_rating_parties(&job, Some(worker), Uuid::new_v4(), worker).is_err());
        assert!(check_rating_parties(&job, None, employer, worker).is_err());
        assert!(matches!(
            check_rating_parties(&job, Some(worker), worker, worker),
            Err(ServiceError::SelfRating)
        ));
    }
}
