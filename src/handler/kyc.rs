use std::sync::Arc;

use axum::{response::IntoResponse, routing::post, Extension, Json, Router};
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::aidtos::{VerifyGstinDto, VerifyPanDto},
    error::HttpError,
    middleware::SessionAuth,
    service::kyc_service::{is_valid_pan, normalize_id, validate_gstin},
    AppState,
};

pub fn kyc_handler() -> Router {
    Router::new()
        .route("/verify-pan", post(verify_pan))
        .route("/verify-gstin", post(verify_gstin))
}

pub async fn verify_pan(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<VerifyPanDto>,
) -> Result<impl IntoResponse, HttpError> {
    let pan = normalize_id(&body.pan);
    if !is_valid_pan(&pan) {
        return Err(HttpError::bad_request("PAN must be in the format AAAAA9999A"));
    }
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let lookup = app_state.kyc_service.verify_pan(&pan, body.name.trim()).await?;

    let user = app_state
        .db_client
        .set_pan_verified(session.user.id, &pan)
        .await
        .map_err(|e| HttpError::internal("Failed to save PAN verification", e))?;

    tracing::info!("PAN verified for {}", user.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "pan_verified": user.pan_verified,
            "registered_name": lookup.registered_name,
        }
    })))
}

pub async fn verify_gstin(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<VerifyGstinDto>,
) -> Result<impl IntoResponse, HttpError> {
    let gstin = normalize_id(&body.gstin);
    validate_gstin(&gstin)?;

    let lookup = app_state.kyc_service.verify_gstin(&gstin).await?;

    let user = app_state
        .db_client
        .set_gstin_verified(session.user.id, &gstin)
        .await
        .map_err(|e| HttpError::internal("Failed to save GSTIN verification", e))?;

    tracing::info!("GSTIN verified for {}", user.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "gstin_verified": user.gstin_verified,
            "registered_name": lookup.registered_name,
            "registration_status": lookup.status,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::test_support::{mount, send_json},
        models::usermodel::{sample_user, UserRole},
    };
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_malformed_pan_rejected_locally() {
        let app = mount(kyc_handler(), Some(sample_user(UserRole::Worker)));
        let (status, body) = send_json(
            app,
            Method::POST,
            "/verify-pan",
            json!({ "pan": "1234567890", "name": "Ravi Kumar" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "PAN must be in the format AAAAA9999A");
    }

    #[tokio::test]
    async fn test_valid_pan_without_provider() {
        let app = mount(kyc_handler(), Some(sample_user(UserRole::Worker)));
        let (status, _) = send_json(
            app,
            Method::POST,
            "/verify-pan",
            json!({ "pan": "abcpe1234f", "name": "Ravi Kumar" }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_bad_gstin_checksum() {
        let app = mount(kyc_handler(), Some(sample_user(UserRole::Employer)));
        let (status, _) = send_json(
            app,
            Method::POST,
            "/verify-gstin",
            json!({ "gstin": "27AAPFU0939F1ZA" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
