use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::trustdb::TrustExt,
    dtos::aidtos::*,
    error::HttpError,
    middleware::{role_check, SessionAuth},
    models::{trustmodel::VerificationMethod, usermodel::UserRole},
    service::transcription_service::MAX_AUDIO_BYTES,
    AppState,
};

/// Audio limit plus room for the multipart envelope.
const UPLOAD_BODY_LIMIT: usize = MAX_AUDIO_BYTES + 1024 * 1024;

pub fn ai_handler() -> Router {
    Router::new()
        .route("/gemini", post(gemini_prompt))
        .route("/generate", post(generate_text))
        .route(
            "/skill-assessment",
            post(skill_assessment).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Worker])
            })),
        )
        .route(
            "/skill-video-submit",
            post(skill_video_submit)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Worker])
                })),
        )
        .route(
            "/transcribe-audio",
            post(transcribe_audio).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}

#[derive(Debug, Default)]
struct Upload {
    skill: Option<String>,
    file_name: Option<String>,
    data: Option<Vec<u8>>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, HttpError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        HttpError::bad_request(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                upload.file_name = Some(
                    field
                        .file_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| "audio.webm".to_string()),
                );
                let data = field.bytes().await.map_err(|e| {
                    HttpError::bad_request(format!("Failed to read file data: {}", e))
                })?;
                upload.data = Some(data.to_vec());
            }
            "skill" => {
                let text = field.text().await.map_err(|e| {
                    HttpError::bad_request(format!("Failed to read skill field: {}", e))
                })?;
                upload.skill = Some(text.trim().to_lowercase()).filter(|s| !s.is_empty());
            }
            _ => tracing::debug!("Ignoring unknown upload field: {}", field_name),
        }
    }

    Ok(upload)
}

pub async fn gemini_prompt(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<GeminiPromptDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let output = app_state.ai_service.generate_text(&body.prompt).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": output,
    })))
}

pub async fn generate_text(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<GenerateTextDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let output = app_state
        .ai_service
        .generate_text(&body.kind.prompt(body.context.trim()))
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": output,
    })))
}

pub async fn skill_assessment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    Json(body): Json<SkillAssessmentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let skill = body.skill.trim().to_lowercase();

    let answers = match body.answers {
        None => {
            let questions = app_state.ai_service.generate_questions(&skill).await?;
            return Ok(Json(serde_json::json!({
                "status": "success",
                "data": { "skill": skill, "questions": questions }
            })));
        }
        Some(answers) => answers,
    };

    if answers.iter().all(|qa| qa.answer.trim().is_empty()) {
        return Err(HttpError::bad_request("Answer at least one question"));
    }

    let evaluation = app_state.ai_service.evaluate_answers(&skill, &answers).await?;

    let verification = app_state
        .db_client
        .create_skill_verification(
            session.user.id,
            &skill,
            VerificationMethod::Quiz,
            evaluation.score,
            evaluation.passed,
            None,
            evaluation.feedback.clone(),
        )
        .await
        .map_err(|e| HttpError::internal("Failed to save skill verification", e))?;

    tracing::info!(
        "Quiz for {} by {}: score {} (passed: {})",
        skill,
        session.user.id,
        evaluation.score,
        evaluation.passed
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "evaluation": evaluation, "verification": verification }
    })))
}

pub async fn skill_video_submit(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionAuth>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let upload = read_upload(multipart).await?;

    let skill = upload
        .skill
        .ok_or_else(|| HttpError::bad_request("Skill is required"))?;
    if skill.len() > 60 {
        return Err(HttpError::bad_request("Skill must be at most 60 characters"));
    }
    let data = upload
        .data
        .ok_or_else(|| HttpError::bad_request("Video file is required"))?;
    let file_name = upload.file_name.unwrap_or_else(|| "video.webm".to_string());

    let transcript = app_state
        .transcription_service
        .transcribe(&file_name, data)
        .await?;
    if transcript.trim().is_empty() {
        return Err(HttpError::bad_request(
            "No speech was detected in the video, please try again",
        ));
    }

    let evaluation = app_state
        .ai_service
        .evaluate_transcript(&skill, &transcript)
        .await?;

    let verification = app_state
        .db_client
        .create_skill_verification(
            session.user.id,
            &skill,
            VerificationMethod::Video,
            evaluation.score,
            evaluation.passed,
            Some(transcript),
            evaluation.feedback.clone(),
        )
        .await
        .map_err(|e| HttpError::internal("Failed to save skill verification", e))?;

    tracing::info!(
        "Video assessment for {} by {}: score {}",
        skill,
        session.user.id,
        evaluation.score
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "evaluation": evaluation, "verification": verification }
    })))
}

pub async fn transcribe_audio(
    Extension(app_state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let upload = read_upload(multipart).await?;

    let data = upload
        .data
        .ok_or_else(|| HttpError::bad_request("Audio file is required"))?;
    let file_name = upload.file_name.unwrap_or_else(|| "audio.webm".to_string());

    let text = app_state
        .transcription_service
        .transcribe(&file_name, data)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "text": text }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::test_support::{mount, send_json},
        models::usermodel::sample_user,
    };
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_employers_cannot_take_skill_assessments() {
        let app = mount(ai_handler(), Some(sample_user(UserRole::Employer)));
        let (status, _) =
            send_json(app, Method::POST, "/skill-assessment", json!({ "skill": "plumbing" })).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_blank_answers_rejected() {
        let app = mount(ai_handler(), Some(sample_user(UserRole::Worker)));
        let (status, body) = send_json(
            app,
            Method::POST,
            "/skill-assessment",
            json!({
                "skill": "plumbing",
                "answers": [{ "question": "How do you fix a leaking tap?", "answer": "  " }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Answer at least one question");
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let app = mount(ai_handler(), Some(sample_user(UserRole::Worker)));
        let (status, _) = send_json(app, Method::POST, "/gemini", json!({ "prompt": "" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
