// service/transcription_service.rs
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::{
    config::Config,
    service::{ai_service::AI_TIMEOUT, error::ServiceError},
    utils::http_retry::send_with_retry,
};

/// Whisper rejects uploads above 25 MB.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

#[derive(Debug, Clone)]
pub struct TranscriptionService {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl TranscriptionService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.whisper_model.clone(),
        }
    }

    pub async fn transcribe(&self, file_name: &str, data: Vec<u8>) -> Result<String, ServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("Speech transcription"))?;

        if data.is_empty() {
            return Err(ServiceError::Validation("Audio file is empty".to_string()));
        }
        if data.len() > MAX_AUDIO_BYTES {
            return Err(ServiceError::Validation(
                "Audio file must be 25 MB or smaller".to_string(),
            ));
        }

        let response = send_with_retry("Whisper", || {
            let form = Form::new()
                .text("model", self.model.clone())
                .part("file", Part::bytes(data.clone()).file_name(file_name.to_string()));

            self.http
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .timeout(AI_TIMEOUT)
                .multipart(form)
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream(format!(
                "Whisper returned {}: {}",
                status, body
            )));
        }

        let payload: WhisperResponse = response.json().await?;
        tracing::debug!("Transcribed {} ({} chars)", file_name, payload.text.len());

        Ok(payload.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[tokio::test]
    async fn test_transcribe_reads_text() {
        let app = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { Json(serde_json::json!({ "text": " main nal theek karta hoon " })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let svc = TranscriptionService {
            http: reqwest::Client::new(),
            endpoint: format!("http://{}/v1/audio/transcriptions", addr),
            api_key: Some("sk-test".to_string()),
            model: "whisper-1".to_string(),
        };

        let text = svc.transcribe("clip.webm", vec![1, 2, 3]).await.unwrap();
        assert_eq!(text, "main nal theek karta hoon");
    }

    #[tokio::test]
    async fn test_requires_key_and_audio() {
        let svc = TranscriptionService::new(&Config::for_tests());
        assert!(matches!(
            svc.transcribe("a.mp3", vec![1]).await,
            Err(ServiceError::NotConfigured(_))
        ));

        let svc = TranscriptionService {
            api_key: Some("sk".to_string()),
            ..TranscriptionService::new(&Config::for_tests())
        };
        assert!(matches!(
            svc.transcribe("a.mp3", vec![]).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
