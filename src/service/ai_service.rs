// service/ai_service.rs
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::Config, service::error::ServiceError, utils::http_retry::send_with_retry};

/// Upper bound for a single provider call.
pub const AI_TIMEOUT: Duration = Duration::from_secs(55);
pub const PASS_MARK: i32 = 60;
const QUESTION_COUNT: usize = 5;

lazy_static! {
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    Ollama,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiText {
    pub text: String,
    pub provider: AiProvider,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    JobDescription,
    ProfileBio,
    CoverNote,
}

impl GenerationKind {
    pub fn prompt(&self, context: &str) -> String {
        let task = match self {
            GenerationKind::JobDescription => {
                "Write a clear, friendly job post for a local gig marketplace in India. \
                 Include the work involved, required skills and what the worker should bring. \
                 Keep it under 150 words."
            }
            GenerationKind::ProfileBio => {
                "Write a short first-person profile bio for a skilled worker on a local gig \
                 marketplace in India. Highlight experience and reliability. Keep it under 80 words."
            }
            GenerationKind::CoverNote => {
                "Write a brief, polite application note from a worker to an employer for the job \
                 below. Keep it under 60 words."
            }
        };
        format!(
            "{}\nNever include phone numbers, emails or social media handles.\n\nDetails:\n{}",
            task, context
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkillEvaluation {
    pub score: i32,
    pub passed: bool,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
struct QuestionsPayload {
    questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EvaluationPayload {
    score: f64,
    #[serde(default)]
    feedback: String,
}

/// Pulls a JSON object out of model output that may be fenced or padded with prose.
pub fn extract_json(text: &str) -> Option<String> {
    let body = if let Some(rest) = text.split("```json").nth(1) {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if start >= end {
        return None;
    }

    Some(TRAILING_COMMA_RE.replace_all(&body[start..=end], "$1").into_owned())
}

fn parse_model_json<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, ServiceError> {
    let json = extract_json(text)
        .ok_or_else(|| ServiceError::Upstream("AI response did not contain JSON".to_string()))?;
    serde_json::from_str(&json)
        .map_err(|e| ServiceError::Upstream(format!("AI response was not understood: {}", e)))
}

fn to_evaluation(payload: EvaluationPayload) -> SkillEvaluation {
    let score = payload.score.round().clamp(0.0, 100.0) as i32;
    SkillEvaluation {
        score,
        passed: score >= PASS_MARK,
        feedback: payload.feedback.trim().to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct AiService {
    http: reqwest::Client,
    gemini_base_url: String,
    gemini_api_key: Option<String>,
    gemini_model: String,
    ollama_url: String,
    ollama_model: String,
}

impl AiService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_api_key: config.gemini_api_key.clone(),
            gemini_model: config.gemini_model.clone(),
            ollama_url: config.ollama_url.trim_end_matches('/').to_string(),
            ollama_model: config.ollama_model.clone(),
        }
    }

    async fn gemini(&self, prompt: &str) -> Result<String, ServiceError> {
        let key = self
            .gemini_api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("Gemini"))?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.gemini_base_url, self.gemini_model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = send_with_retry("Gemini", || {
            self.http
                .post(&url)
                .query(&[("key", key)])
                .timeout(AI_TIMEOUT)
                .json(&body)
        })
        .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "Gemini returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Upstream("Gemini returned no text".to_string()))
    }

    async fn ollama(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/api/generate", self.ollama_url);
        let body = json!({ "model": self.ollama_model, "prompt": prompt, "stream": false });

        let response = send_with_retry("Ollama", || {
            self.http.post(&url).timeout(AI_TIMEOUT).json(&body)
        })
        .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "Ollama returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        payload["response"]
            .as_str()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Upstream("Ollama returned no text".to_string()))
    }

    /// Gemini first; any failure falls back to the self-hosted Ollama model.
    pub async fn generate_text(&self, prompt: &str) -> Result<AiText, ServiceError> {
        match self.gemini(prompt).await {
            Ok(text) => {
                return Ok(AiText {
                    text,
                    provider: AiProvider::Gemini,
                })
            }
            Err(ServiceError::NotConfigured(_)) => {
                tracing::debug!("Gemini not configured, using Ollama");
            }
            Err(e) => {
                tracing::warn!("Gemini failed ({}), falling back to Ollama", e);
            }
        }

        let text = self.ollama(prompt).await.map_err(|e| {
            tracing::error!("Ollama fallback failed: {}", e);
            ServiceError::Upstream("All AI providers are unavailable".to_string())
        })?;

        Ok(AiText {
            text,
            provider: AiProvider::Ollama,
        })
    }

    pub async fn generate_questions(&self, skill: &str) -> Result<Vec<String>, ServiceError> {
        let prompt = format!(
            "You are assessing a tradesperson's practical knowledge of \"{}\". \
             Write {} short practical questions a skilled worker could answer in one or two sentences. \
             Respond only with JSON: {{\"questions\": [\"...\"]}}",
            skill, QUESTION_COUNT
        );

        let output = self.generate_text(&prompt).await?;
        let payload: QuestionsPayload = parse_model_json(&output.text)?;

        let questions: Vec<String> = payload
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(QUESTION_COUNT)
            .collect();

        if questions.is_empty() {
            return Err(ServiceError::Upstream("AI returned no questions".to_string()));
        }
        Ok(questions)
    }

    pub async fn evaluate_answers(
        &self,
        skill: &str,
        answers: &[QuestionAnswer],
    ) -> Result<SkillEvaluation, ServiceError> {
        let transcript = answers
            .iter()
            .enumerate()
            .map(|(i, qa)| format!("Q{}: {}\nA{}: {}", i + 1, qa.question, i + 1, qa.answer))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Grade these answers from a worker claiming the skill \"{}\". \
             Score practical correctness from 0 to 100 and give one or two sentences of feedback. \
             Respond only with JSON: {{\"score\": <number>, \"feedback\": \"...\"}}\n\n{}",
            skill, transcript
        );

        let output = self.generate_text(&prompt).await?;
        Ok(to_evaluation(parse_model_json(&output.text)?))
    }

    pub async fn evaluate_transcript(
        &self,
        skill: &str,
        transcript: &str,
    ) -> Result<SkillEvaluation, ServiceError> {
        let prompt = format!(
            "A worker recorded a video explaining how they do \"{}\" work. Below is the transcript. \
             Score how well it demonstrates real hands-on knowledge from 0 to 100 and give one or \
             two sentences of feedback. Respond only with JSON: \
             {{\"score\": <number>, \"feedback\": \"...\"}}\n\nTranscript:\n{}",
            skill, transcript
        );

        let output = self.generate_text(&prompt).await?;
        Ok(to_evaluation(parse_model_json(&output.text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn service(gemini_url: String, ollama_url: String, key: Option<&str>) -> AiService {
        AiService {
            http: reqwest::Client::new(),
            gemini_base_url: gemini_url,
            gemini_api_key: key.map(str::to_string),
            gemini_model: "gemini-1.5-flash".to_string(),
            ollama_url,
            ollama_model: "llama3".to_string(),
        }
    }

    fn ollama_router(reply: &'static str) -> Router {
        Router::new().route(
            "/api/generate",
            post(move || async move { Json(json!({ "response": reply })) }),
        )
    }

    #[tokio::test]
    async fn test_gemini_primary() {
        let gemini = Router::new().route(
            "/models/:model",
            post(|| async {
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": " Hello from Gemini " }] } }]
                }))
            }),
        );
        let svc = service(spawn(gemini).await, spawn(ollama_router("unused")).await, Some("k"));

        let out = svc.generate_text("hi").await.unwrap();
        assert_eq!(out.provider, AiProvider::Gemini);
        assert_eq!(out.text, "Hello from Gemini");
    }

    #[tokio::test]
    async fn test_falls_back_to_ollama_on_gemini_error() {
        let gemini = Router::new().route(
            "/models/:model",
            post(|| async { (StatusCode::BAD_REQUEST, "quota") }),
        );
        let svc = service(
            spawn(gemini).await,
            spawn(ollama_router("local answer")).await,
            Some("k"),
        );

        let out = svc.generate_text("hi").await.unwrap();
        assert_eq!(out.provider, AiProvider::Ollama);
        assert_eq!(out.text, "local answer");
    }

    #[tokio::test]
    async fn test_unconfigured_gemini_goes_straight_to_ollama() {
        let svc = service(
            "http://127.0.0.1:1".to_string(),
            spawn(ollama_router("ok")).await,
            None,
        );
        assert_eq!(svc.generate_text("hi").await.unwrap().provider, AiProvider::Ollama);
    }

    #[tokio::test]
    async fn test_questions_parsed_from_fenced_json() {
        let reply = "Sure!\n```json\n{\"questions\": [\"How do you fix a leak?\", \"  \", \"What is PTFE tape?\",]}\n```";
        let svc = service(
            "http://127.0.0.1:1".to_string(),
            spawn(ollama_router(reply)).await,
            None,
        );

        let questions = svc.generate_questions("plumbing").await.unwrap();
        assert_eq!(questions, vec!["How do you fix a leak?", "What is PTFE tape?"]);
    }

    #[tokio::test]
    async fn test_evaluation_clamps_score() {
        let svc = service(
            "http://127.0.0.1:1".to_string(),
            spawn(ollama_router("{\"score\": 130, \"feedback\": \"Excellent\"}")).await,
            None,
        );

        let eval = svc.evaluate_transcript("tiling", "I level the floor first").await.unwrap();
        assert_eq!(
            eval,
            SkillEvaluation {
                score: 100,
                passed: true,
                feedback: "Excellent".to_string()
            }
        );
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(
            extract_json("noise {\"a\": 1,} tail").as_deref(),
            Some("{\"a\": 1}")
        );
        assert!(extract_json("no json here").is_none());
    }

    #[test]
    fn test_prompts_forbid_contact_details() {
        let prompt = GenerationKind::JobDescription.prompt("Paint a 2BHK in Indore");
        assert!(prompt.contains("Paint a 2BHK in Indore"));
        assert!(prompt.contains("Never include phone numbers"));
    }

    #[test]
    fn test_failed_score_below_pass_mark() {
        let eval = to_evaluation(EvaluationPayload {
            score: 59.4,
            feedback: " Needs practice ".to_string(),
        });
        assert_eq!(eval.score, 59);
        assert!(!eval.passed);
        assert_eq!(eval.feedback, "Needs practice");
    }
}
