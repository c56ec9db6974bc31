use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{db::is_unique_violation, userdb::UserExt},
    dtos::userdtos::*,
    error::{ErrorMessage, HttpError},
    mail::mails::{send_otp_email, send_welcome_email},
    middleware::{auth, rate_limit::client_ip, SessionAuth, SESSION_COOKIE},
    models::usermodel::UserRole,
    service::otp_service::{issue_otp, verify_otp},
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout).layer(middleware::from_fn(auth)))
        .route("/me", get(get_me).layer(middleware::from_fn(auth)))
        .route("/otp/send", post(send_phone_otp))
        .route("/otp/verify", post(verify_phone_otp))
        .route("/email-otp/send", post(send_email_otp))
        .route("/email-otp/verify", post(verify_email_otp))
}

/// Persists a new session and returns the raw token with its cookie header.
async fn start_session(app_state: &AppState, user_id: Uuid) -> Result<(String, HeaderValue), HttpError> {
    let raw_token = token::generate_session_token();
    let max_age_hours = app_state.env.session_max_age_hours;

    app_state
        .db_client
        .create_session(
            user_id,
            &token::hash_token(&raw_token),
            Utc::now() + Duration::hours(max_age_hours),
        )
        .await
        .map_err(|e| HttpError::internal("Failed to create session", e))?;

    let cookie = Cookie::build((SESSION_COOKIE, raw_token.clone()))
        .path("/")
        .max_age(time::Duration::hours(max_age_hours))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    let cookie = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| HttpError::internal("Invalid session cookie", e))?;

    Ok((raw_token, cookie))
}

pub async fn signup(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<SignupDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.role == UserRole::Admin {
        return Err(HttpError::bad_request("Role must be worker or employer"));
    }

    let phone = normalize_phone(&body.phone)
        .ok_or_else(|| HttpError::bad_request("Enter a valid 10-digit Indian mobile number"))?;
    let email = body
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let existing = app_state
        .db_client
        .get_user(None, Some(&phone), None)
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?;
    if existing.is_some() {
        return Err(HttpError::conflict(ErrorMessage::PhoneExist.to_string()));
    }

    if let Some(email) = email.as_deref() {
        let existing = app_state
            .db_client
            .get_user(None, None, Some(email))
            .await
            .map_err(|e| HttpError::internal("User lookup failed", e))?;
        if existing.is_some() {
            return Err(HttpError::conflict(ErrorMessage::EmailExist.to_string()));
        }
    }

    let hashed_password = password::hash(&body.password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user = app_state
        .db_client
        .save_user(body.name.trim().to_string(), phone, email, hashed_password, body.role)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HttpError::conflict(ErrorMessage::PhoneExist.to_string())
            } else {
                HttpError::internal("Failed to create user", e)
            }
        })?;

    tracing::info!("New {} signed up: {}", user.role.to_str(), user.id);

    if let Some(email) = user.email.clone() {
        let mailer = app_state.mailer.clone();
        let name = user.name.clone();
        let role = user.role.to_str().to_string();
        let app_url = app_state.env.app_url.clone();
        tokio::spawn(async move {
            if !mailer.is_configured() {
                return;
            }
            if let Err(e) = send_welcome_email(&mailer, &email, &name, &role, &app_url).await {
                tracing::warn!("Failed to send welcome email to {}: {}", email, e);
            }
        });
    }

    let (raw_token, cookie) = start_session(&app_state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponseDto {
            status: "success".to_string(),
            token: raw_token,
            data: UserData { user },
        }),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let identifier = body.identifier.trim().to_lowercase();
    let limiter_key = format!("{}|{}", client_ip(&headers), identifier);
    if !app_state.login_limiter.is_allowed(&limiter_key) {
        return Err(HttpError::too_many_requests(
            "Too many login attempts, please try again in a few minutes",
        ));
    }

    let result = if identifier.contains('@') {
        app_state.db_client.get_user(None, None, Some(&identifier)).await
    } else {
        match normalize_phone(&identifier) {
            Some(phone) => app_state.db_client.get_user(None, Some(&phone), None).await,
            None => Ok(None),
        }
    };

    let user = result
        .map_err(|e| HttpError::internal("User lookup failed", e))?
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;
    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    if user.suspended {
        return Err(HttpError::forbidden(ErrorMessage::AccountSuspended.to_string()));
    }

    let (raw_token, cookie) = start_session(&app_state, user.id).await?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponseDto {
            status: "success".to_string(),
            token: raw_token,
            data: UserData { user },
        }),
    ))
}

pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_session(session.session_id)
        .await
        .map_err(|e| HttpError::internal("Failed to delete session", e))?;

    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();
    let cookie = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| HttpError::internal("Invalid session cookie", e))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(Response {
            status: "success",
            message: "Logged out".to_string(),
        }),
    ))
}

pub async fn get_me(
    Extension(session): Extension<SessionAuth>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData { user: session.user },
    }))
}

pub async fn send_phone_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<PhoneOtpSendDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let phone = normalize_phone(&body.phone)
        .ok_or_else(|| HttpError::bad_request("Enter a valid 10-digit Indian mobile number"))?;

    if !app_state.otp_limiter.is_allowed(&phone) {
        return Err(HttpError::too_many_requests(
            "Too many codes requested, please wait before trying again",
        ));
    }

    app_state.sms_otp.send(&phone).await?;

    Ok(Json(Response {
        status: "success",
        message: "Verification code sent".to_string(),
    }))
}

pub async fn verify_phone_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<PhoneOtpVerifyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let phone = normalize_phone(&body.phone)
        .ok_or_else(|| HttpError::bad_request("Enter a valid 10-digit Indian mobile number"))?;

    if !app_state.sms_otp.check(&phone, body.code.trim()).await? {
        return Err(HttpError::bad_request("Invalid or expired verification code"));
    }

    let user = app_state
        .db_client
        .get_user(None, Some(&phone), None)
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?;

    if let Some(user) = user {
        app_state
            .db_client
            .mark_phone_verified(user.id)
            .await
            .map_err(|e| HttpError::internal("Failed to mark phone verified", e))?;
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "verified": true,
        "phone": phone,
    })))
}

pub async fn send_email_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<EmailOtpSendDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let email = body.email.trim().to_lowercase();

    if !app_state.otp_limiter.is_allowed(&email) {
        return Err(HttpError::too_many_requests(
            "Too many codes requested, please wait before trying again",
        ));
    }

    let name = app_state
        .db_client
        .get_user(None, None, Some(&email))
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?
        .map(|u| u.name)
        .unwrap_or_else(|| "there".to_string());

    let code = issue_otp(app_state.otp_store.as_ref(), &email).await?;

    if let Err(e) = send_otp_email(&app_state.mailer, &email, &name, &code).await {
        if let Err(remove_err) = app_state.otp_store.remove(&email).await {
            tracing::warn!("Failed to discard undelivered OTP for {}: {}", email, remove_err);
        }
        return Err(e.into());
    }

    Ok(Json(Response {
        status: "success",
        message: "Verification code sent to your email".to_string(),
    }))
}

pub async fn verify_email_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<EmailOtpVerifyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let email = body.email.trim().to_lowercase();
    verify_otp(app_state.otp_store.as_ref(), &email, body.code.trim()).await?;

    let user = app_state
        .db_client
        .mark_email_verified(&email)
        .await
        .map_err(|e| HttpError::internal("Failed to mark email verified", e))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "verified": true,
        "user_id": user.map(|u| u.id),
    })))
}
