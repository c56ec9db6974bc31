use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{trustdb::TrustExt, userdb::UserExt},
    dtos::userdtos::*,
    error::HttpError,
    middleware::SessionAuth,
    service::matching_service::normalize_skills,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/:user_id", get(get_public_profile))
}

pub async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.latitude.is_some() != body.longitude.is_some() {
        return Err(HttpError::bad_request(
            "Latitude and longitude must be provided together",
        ));
    }

    let mut user = session.user;

    if let Some(bio) = body.bio {
        user.bio = Some(bio.trim().to_string()).filter(|b| !b.is_empty());
    }
    if let Some(skills) = body.skills {
        user.skills = normalize_skills(&skills);
    }
    if let Some(city) = body.city {
        user.city = Some(city.trim().to_string());
    }
    if let Some(pincode) = body.pincode {
        user.pincode = Some(pincode);
    }
    if let (Some(lat), Some(lng)) = (body.latitude, body.longitude) {
        user.latitude = Some(lat);
        user.longitude = Some(lng);
    }
    user.profile_complete = user.compute_profile_complete();

    let user = app_state
        .db_client
        .save_profile(&user)
        .await
        .map_err(|e| HttpError::internal("Failed to update profile", e))?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData { user },
    }))
}

pub async fn get_public_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let verified = app_state
        .db_client
        .get_verified_skills(user.id)
        .await
        .map_err(|e| HttpError::internal("Failed to load verified skills", e))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "user": PublicProfileDto::from_user(&user, &verified) }
    })))
}
