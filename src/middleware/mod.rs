pub mod rate_limit;

use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    db::userdb::UserExt,
    error::{ErrorMessage, HttpError},
    models::usermodel::{User, UserRole},
    utils::token,
    AppState,
};

pub const SESSION_COOKIE: &str = "session";

/// The authenticated caller, inserted into request extensions by [`auth`].
#[derive(Debug, Clone)]
pub struct SessionAuth {
    pub user: User,
    pub session_id: Uuid,
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let raw_token = cookie_jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(token::bearer_from_header)
                .map(str::to_owned)
        });

    let raw_token = raw_token
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let session = app_state
        .db_client
        .get_session_by_hash(&token::hash_token(&raw_token))
        .await
        .map_err(|e| HttpError::internal("Session lookup failed", e))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    if session.is_expired() {
        if let Err(e) = app_state.db_client.delete_session(session.id).await {
            tracing::warn!("Failed to delete expired session {}: {}", session.id, e);
        }
        return Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()));
    }

    let user = app_state
        .db_client
        .get_user(Some(session.user_id), None, None)
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    if user.suspended {
        return Err(HttpError::forbidden(ErrorMessage::AccountSuspended.to_string()));
    }

    req.extensions_mut().insert(SessionAuth {
        user,
        session_id: session.id,
    });

    Ok(next.run(req).await)
}

pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let auth = req
        .extensions()
        .get::<SessionAuth>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&auth.user.role) {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    Ok(next.run(req).await)
}
