use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{chatdb::ChatExt, jobdb::JobExt, userdb::UserExt},
    dtos::chatdtos::*,
    error::HttpError,
    middleware::SessionAuth,
    models::chatmodel::Conversation,
    service::chat_filter::{filter_message, mask_contact_info, FilterResult},
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/conversations", get(get_conversations).post(start_conversation))
        .route(
            "/conversations/:conversation_id/messages",
            get(get_messages).post(send_message),
        )
        .route("/conversations/:conversation_id/read", put(mark_as_read))
}

fn blocked_response(result: &FilterResult) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "status": "fail",
            "blocked": true,
            "message": "Message blocked for your safety",
            "reason": result.reason,
            "category": result.category,
        })),
    )
        .into_response()
}

/// Loads a conversation the caller takes part in.
async fn load_conversation(
    app_state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Conversation, HttpError> {
    let conversation = app_state
        .db_client
        .get_conversation(conversation_id)
        .await
        .map_err(|e| HttpError::internal("Conversation lookup failed", e))?
        .ok_or_else(|| HttpError::not_found("Conversation not found"))?;

    if !conversation.has_participant(user_id) {
        return Err(HttpError::forbidden("You are not part of this conversation"));
    }

    Ok(conversation)
}

pub async fn start_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<StartConversationDto>,
) -> Result<impl IntoResponse, HttpError> {
    if body.other_user_id == session.user.id {
        return Err(HttpError::bad_request("You cannot start a conversation with yourself"));
    }

    let other_user = app_state
        .db_client
        .get_user(Some(body.other_user_id), None, None)
        .await
        .map_err(|e| HttpError::internal("User lookup failed", e))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    if let Some(job_id) = body.job_id {
        app_state
            .db_client
            .get_job(job_id)
            .await
            .map_err(|e| HttpError::internal("Job lookup failed", e))?
            .ok_or_else(|| HttpError::not_found("Job not found"))?;
    }

    let conversation = app_state
        .db_client
        .create_or_get_conversation(session.user.id, other_user.id, body.job_id)
        .await
        .map_err(|e| HttpError::internal("Failed to open conversation", e))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ConversationWithParticipant {
            conversation,
            other_user: Some(ChatParticipant::from(&other_user)),
        }
    })))
}

pub async fn get_conversations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Query(pagination): Query<PaginationDto>,
) -> Result<impl IntoResponse, HttpError> {
    pagination
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (limit, offset) = pagination.limit_offset();

    let conversations = app_state
        .db_client
        .get_user_conversations(session.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::internal("Failed to load conversations", e))?;

    let mut results = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let other_id = conversation.other_participant(session.user.id);
        let other_user = app_state
            .db_client
            .get_user(Some(other_id), None, None)
            .await
            .map_err(|e| HttpError::internal("User lookup failed", e))?;

        results.push(ConversationWithParticipant {
            conversation,
            other_user: other_user.as_ref().map(ChatParticipant::from),
        });
    }

    Ok(Json(ConversationListResponseDto {
        status: "success",
        results: results.len(),
        conversations: results,
    }))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(conversation_id): Path<Uuid>,
    Query(pagination): Query<PaginationDto>,
) -> Result<impl IntoResponse, HttpError> {
    pagination
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let conversation = load_conversation(&app_state, conversation_id, session.user.id).await?;
    let (limit, offset) = pagination.limit_offset();

    let messages = app_state
        .db_client
        .get_messages(conversation.id, limit, offset)
        .await
        .map_err(|e| HttpError::internal("Failed to load messages", e))?;

    Ok(Json(MessageListResponseDto {
        status: "success",
        results: messages.len(),
        messages,
    }))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<Response, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let verdict = filter_message(&body.content);
    if verdict.blocked {
        tracing::warn!(
            "Blocked message from {} in {}: {}",
            session.user.id,
            conversation_id,
            verdict.category.map(|c| c.to_str()).unwrap_or("unknown")
        );
        return Ok(blocked_response(&verdict));
    }

    let conversation = load_conversation(&app_state, conversation_id, session.user.id).await?;

    let message = app_state
        .db_client
        .send_message(conversation.id, session.user.id, mask_contact_info(&body.content))
        .await
        .map_err(|e| HttpError::internal("Failed to send message", e))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": { "message": message }
        })),
    )
        .into_response())
}

pub async fn mark_as_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let conversation = load_conversation(&app_state, conversation_id, session.user.id).await?;

    let updated = app_state
        .db_client
        .mark_messages_as_read(conversation.id, session.user.id)
        .await
        .map_err(|e| HttpError::internal("Failed to mark messages as read", e))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "updated": updated,
    })))
}
