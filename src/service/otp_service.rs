// service/otp_service.rs
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    config::Config,
    service::error::ServiceError,
    utils::{
        http_retry::send_with_retry,
        otp_generator::{generate_otp, hash_otp, otp_matches},
    },
};

pub const OTP_EXPIRY_MINUTES: i64 = 10;
pub const MAX_OTP_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpRecord {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

impl OtpRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Pending email OTPs keyed by lowercased recipient.
#[async_trait]
pub trait OtpStore: Send + Sync + std::fmt::Debug {
    async fn put(&self, recipient: &str, record: OtpRecord) -> Result<(), ServiceError>;

    async fn get(&self, recipient: &str) -> Result<Option<OtpRecord>, ServiceError>;

    async fn remove(&self, recipient: &str) -> Result<(), ServiceError>;

    /// Drops expired entries; returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, ServiceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    entries: RwLock<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, recipient: &str, record: OtpRecord) -> Result<(), ServiceError> {
        self.entries
            .write()
            .await
            .insert(recipient.to_lowercase(), record);
        Ok(())
    }

    async fn get(&self, recipient: &str) -> Result<Option<OtpRecord>, ServiceError> {
        Ok(self.entries.read().await.get(&recipient.to_lowercase()).cloned())
    }

    async fn remove(&self, recipient: &str) -> Result<(), ServiceError> {
        self.entries.write().await.remove(&recipient.to_lowercase());
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, ServiceError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, record| !record.is_expired());
        Ok(before - entries.len())
    }
}

/// Shared store for multi-instance deployments. Redis TTLs handle expiry.
pub struct RedisOtpStore {
    redis: Arc<ConnectionManager>,
}

impl std::fmt::Debug for RedisOtpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisOtpStore").finish()
    }
}

impl RedisOtpStore {
    pub fn new(redis: Arc<ConnectionManager>) -> Self {
        Self { redis }
    }

    fn key(recipient: &str) -> String {
        format!("otp:email:{}", recipient.to_lowercase())
    }
}

fn redis_error(e: redis::RedisError) -> ServiceError {
    ServiceError::Other(format!("Redis error: {}", e))
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, recipient: &str, record: OtpRecord) -> Result<(), ServiceError> {
        let ttl = (record.expires_at - Utc::now()).num_seconds().max(1) as usize;
        let json = serde_json::to_string(&record).map_err(|e| ServiceError::Other(e.to_string()))?;

        let mut conn = ConnectionManager::clone(&self.redis);
        let _: () = conn
            .set_ex(Self::key(recipient), json, ttl)
            .await
            .map_err(redis_error)?;
        Ok(())
    }

    async fn get(&self, recipient: &str) -> Result<Option<OtpRecord>, ServiceError> {
        let mut conn = ConnectionManager::clone(&self.redis);
        let raw: Option<String> = conn.get(Self::key(recipient)).await.map_err(redis_error)?;

        Ok(raw.and_then(|json| serde_json::from_str(&json).ok()))
    }

    async fn remove(&self, recipient: &str) -> Result<(), ServiceError> {
        let mut conn = ConnectionManager::clone(&self.redis);
        let _: () = conn.del(Self::key(recipient)).await.map_err(redis_error)?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, ServiceError> {
        Ok(0)
    }
}

/// Creates a fresh code for `recipient`, replacing any pending one.
pub async fn issue_otp(store: &dyn OtpStore, recipient: &str) -> Result<String, ServiceError> {
    let code = generate_otp();
    let record = OtpRecord {
        code_hash: hash_otp(recipient, &code),
        expires_at: Utc::now() + Duration::minutes(OTP_EXPIRY_MINUTES),
        attempts: 0,
    };
    store.put(recipient, record).await?;
    Ok(code)
}

/// Checks `code` against the pending OTP. A correct code or an exhausted
/// record is consumed; a wrong code counts as an attempt.
pub async fn verify_otp(
    store: &dyn OtpStore,
    recipient: &str,
    code: &str,
) -> Result<(), ServiceError> {
    let mut record = store.get(recipient).await?.ok_or_else(|| {
        ServiceError::Validation("No verification code was requested for this address".to_string())
    })?;

    if record.is_expired() {
        store.remove(recipient).await?;
        return Err(ServiceError::Validation(
            "Verification code has expired, please request a new one".to_string(),
        ));
    }

    if record.attempts >= MAX_OTP_ATTEMPTS {
        store.remove(recipient).await?;
        return Err(ServiceError::TooManyAttempts(
            "please request a new verification code".to_string(),
        ));
    }

    if otp_matches(&record.code_hash, recipient, code) {
        store.remove(recipient).await?;
        return Ok(());
    }

    record.attempts += 1;
    let remaining = MAX_OTP_ATTEMPTS - record.attempts;
    store.put(recipient, record).await?;

    Err(ServiceError::Validation(format!(
        "Invalid verification code, {} attempt(s) left",
        remaining
    )))
}

#[derive(Debug, Deserialize)]
struct VerifyStatus {
    status: String,
}

/// Phone OTP through Twilio Verify; Twilio owns code generation and expiry.
#[derive(Debug, Clone)]
pub struct SmsOtpClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: Option<String>,
    auth_token: Option<String>,
    service_sid: Option<String>,
}

impl SmsOtpClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://verify.twilio.com/v2".to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            service_sid: config.twilio_verify_sid.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str, &str), ServiceError> {
        match (&self.account_sid, &self.auth_token, &self.service_sid) {
            (Some(sid), Some(token), Some(service)) => Ok((sid, token, service)),
            _ => Err(ServiceError::NotConfigured("SMS verification")),
        }
    }

    async fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<VerifyStatus, ServiceError> {
        let (sid, token, service) = self.credentials()?;
        let url = format!("{}/Services/{}/{}", self.base_url, service, path);

        let response = send_with_retry("Twilio Verify", || {
            self.http
                .post(&url)
                .basic_auth(sid, Some(token))
                .form(params)
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream(format!(
                "Twilio returned {}: {}",
                status, body
            )));
        }

        Ok(response.json::<VerifyStatus>().await?)
    }

    pub async fn send(&self, phone: &str) -> Result<(), ServiceError> {
        let result = self
            .post("Verifications", &[("To", phone), ("Channel", "sms")])
            .await?;
        tracing::info!("SMS verification to {} is {}", phone, result.status);
        Ok(())
    }

    /// True when Twilio approved the code.
    pub async fn check(&self, phone: &str, code: &str) -> Result<bool, ServiceError> {
        let result = self
            .post("VerificationCheck", &[("To", phone), ("Code", code)])
            .await?;
        Ok(result.status == "approved")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[tokio::test]
    async fn test_issue_and_verify() {
        let store = InMemoryOtpStore::new();
        let code = issue_otp(&store, "Asha@Example.com").await.unwrap();

        assert!(verify_otp(&store, "asha@example.com", &code).await.is_ok());
        // consumed
        assert!(verify_otp(&store, "asha@example.com", &code).await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_codes_exhaust_attempts() {
        let store = InMemoryOtpStore::new();
        let code = issue_otp(&store, "a@b.in").await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_OTP_ATTEMPTS {
            let err = verify_otp(&store, "a@b.in", wrong).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }

        let err = verify_otp(&store, "a@b.in", &code).await.unwrap_err();
        assert!(matches!(err, ServiceError::TooManyAttempts(_)));
        assert!(store.get("a@b.in").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_code_rejected_and_purged() {
        let store = InMemoryOtpStore::new();
        store
            .put(
                "old@b.in",
                OtpRecord {
                    code_hash: hash_otp("old@b.in", "123456"),
                    expires_at: Utc::now() - Duration::minutes(1),
                    attempts: 0,
                },
            )
            .await
            .unwrap();
        issue_otp(&store, "new@b.in").await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.get("new@b.in").await.unwrap().is_some());

        store
            .put(
                "old@b.in",
                OtpRecord {
                    code_hash: hash_otp("old@b.in", "123456"),
                    expires_at: Utc::now() - Duration::seconds(1),
                    attempts: 0,
                },
            )
            .await
            .unwrap();
        assert!(verify_otp(&store, "old@b.in", "123456").await.is_err());
    }

    #[tokio::test]
    async fn test_sms_client_requires_configuration() {
        let client = SmsOtpClient::new(&Config::for_tests());
        let err = client.send("+919876543210").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_sms_check_reads_approval() {
        let app = Router::new().route(
            "/Services/VA123/VerificationCheck",
            post(|| async { Json(serde_json::json!({ "status": "approved" })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = SmsOtpClient {
            http: reqwest::Client::new(),
            base_url: format!("http://{}", addr),
            account_sid: Some("AC1".to_string()),
            auth_token: Some("token".to_string()),
            service_sid: Some("VA123".to_string()),
        };

        assert!(client.check("+919876543210", "123456").await.unwrap());
    }
}
