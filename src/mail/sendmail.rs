// mail/sendmail.rs
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use serde_json::json;

use crate::{config::Config, service::error::ServiceError, utils::http_retry::send_with_retry};

#[derive(Debug, Clone)]
struct SmtpSettings {
    host: String,
    port: u16,
    username: String,
    password: String,
}

/// Sends transactional mail over SMTP when `SMTP_HOST` is set, otherwise
/// through the Resend API.
#[derive(Debug, Clone)]
pub struct Mailer {
    http: reqwest::Client,
    from_email: String,
    resend_url: String,
    resend_api_key: Option<String>,
    smtp: Option<SmtpSettings>,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            from_email: config.from_email.clone(),
            resend_url: "https://api.resend.com/emails".to_string(),
            resend_api_key: config.resend_api_key.clone(),
            smtp: config.smtp_host.as_ref().map(|host| SmtpSettings {
                host: host.clone(),
                port: config.smtp_port,
                username: config.smtp_username.clone(),
                password: config.smtp_password.clone(),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.smtp.is_some() || self.resend_api_key.is_some()
    }

    pub async fn send(&self, to_email: &str, subject: &str, html_body: &str) -> Result<(), ServiceError> {
        if !validator::validate_email(to_email) {
            return Err(ServiceError::Validation(format!(
                "Invalid email address: {}",
                to_email
            )));
        }

        if let Some(smtp) = &self.smtp {
            return self.send_via_smtp(smtp, to_email, subject, html_body).await;
        }

        self.send_via_resend(to_email, subject, html_body).await
    }

    async fn send_via_resend(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), ServiceError> {
        let api_key = self
            .resend_api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("Email delivery"))?;

        let request_body = json!({
            "from": self.from_email,
            "to": to_email,
            "subject": subject,
            "html": html_body,
        });

        let response = send_with_retry("Resend", || {
            self.http
                .post(&self.resend_url)
                .bearer_auth(api_key)
                .json(&request_body)
        })
        .await?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::error!("Email to {} failed with {}: {}", to_email, status, response_text);
            return Err(ServiceError::Upstream(format!("Email provider returned {}", status)));
        }

        let email_id = serde_json::from_str::<serde_json::Value>(&response_text)
            .ok()
            .and_then(|v| v["id"].as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!("Email sent to {} (id: {})", to_email, email_id);

        Ok(())
    }

    async fn send_via_smtp(
        &self,
        smtp: &SmtpSettings,
        to_email: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), ServiceError> {
        let invalid = |e: lettre::address::AddressError| ServiceError::Validation(e.to_string());

        let email = Message::builder()
            .from(self.from_email.parse().map_err(invalid)?)
            .to(to_email.parse().map_err(invalid)?)
            .subject(subject)
            .multipart(
                MultiPart::alternative().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.to_string()),
                ),
            )
            .map_err(|e| ServiceError::Other(e.to_string()))?;

        let mailer = SmtpTransport::relay(&smtp.host)
            .map_err(|e| ServiceError::Upstream(e.to_string()))?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()))
            .build();

        // lettre's SMTP transport blocks.
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Other(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::info!("Email sent via SMTP to {}", to_email);
                Ok(())
            }
            Err(e) => {
                tracing::error!("SMTP send to {} failed: {}", to_email, e);
                Err(ServiceError::Upstream("SMTP send failed".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[tokio::test]
    async fn test_rejects_invalid_address() {
        let mailer = Mailer::new(&Config::for_tests());
        assert!(matches!(
            mailer.send("not-an-email", "Hi", "<p>x</p>").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_mailer() {
        let mailer = Mailer::new(&Config::for_tests());
        assert!(!mailer.is_configured());
        assert!(matches!(
            mailer.send("a@b.in", "Hi", "<p>x</p>").await,
            Err(ServiceError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_through_resend() {
        let app = Router::new().route(
            "/emails",
            post(|| async { Json(serde_json::json!({ "id": "em_123" })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mailer = Mailer {
            resend_url: format!("http://{}/emails", addr),
            resend_api_key: Some("re_test".to_string()),
            ..Mailer::new(&Config::for_tests())
        };

        assert!(mailer.send("asha@example.com", "Hi", "<p>x</p>").await.is_ok());
    }
}
