// config.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub port: u16,
    pub session_max_age_hours: i64,
    pub platform_fee_percent: i64,
    pub allowed_origins: Vec<String>,
    pub redis_url: Option<String>,
    // SMS OTP (Twilio Verify)
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_verify_sid: Option<String>,
    // Email
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    // AI providers
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub whisper_model: String,
    // KYC provider
    pub kyc_api_url: Option<String>,
    pub kyc_api_key: Option<String>,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn with_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(default),
    }
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        let database_url = optional("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let app_url = with_default("APP_URL", "http://localhost:3000");

        let platform_fee_percent = parsed("PLATFORM_FEE_PERCENT", 5i64)?;
        if !(0..=50).contains(&platform_fee_percent) {
            return Err(ConfigError::Invalid(
                "PLATFORM_FEE_PERCENT",
                platform_fee_percent.to_string(),
            ));
        }

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| vec![app_url.clone(), "http://localhost:3000".to_string()]);

        Ok(Config {
            database_url,
            port: parsed("PORT", 8000u16)?,
            session_max_age_hours: parsed("SESSION_MAX_AGE_HOURS", 720i64)?,
            platform_fee_percent,
            allowed_origins,
            redis_url: optional("REDIS_URL"),
            twilio_account_sid: optional("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: optional("TWILIO_AUTH_TOKEN"),
            twilio_verify_sid: optional("TWILIO_VERIFY_SERVICE_SID"),
            resend_api_key: optional("RESEND_API_KEY"),
            from_email: with_default("FROM_EMAIL", "KaamSetu <noreply@kaamsetu.in>"),
            smtp_host: optional("SMTP_HOST"),
            smtp_port: parsed("SMTP_PORT", 587u16)?,
            smtp_username: with_default("SMTP_USERNAME", ""),
            smtp_password: with_default("SMTP_PASSWORD", ""),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: with_default("GEMINI_MODEL", "gemini-1.5-flash"),
            ollama_url: with_default("OLLAMA_URL", "http://localhost:11434"),
            ollama_model: with_default("OLLAMA_MODEL", "llama3"),
            openai_api_key: optional("OPENAI_API_KEY"),
            whisper_model: with_default("WHISPER_MODEL", "whisper-1"),
            kyc_api_url: optional("KYC_API_URL"),
            kyc_api_key: optional("KYC_API_KEY"),
            app_url,
        })
    }

    /// Bare configuration for unit tests; no external providers configured.
    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config {
            database_url: "postgres://localhost/kaamsetu_test".to_string(),
            app_url: "http://localhost:3000".to_string(),
            port: 8000,
            session_max_age_hours: 720,
            platform_fee_percent: 5,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            redis_url: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_verify_sid: None,
            resend_api_key: None,
            from_email: "KaamSetu <noreply@kaamsetu.in>".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            openai_api_key: None,
            whisper_model: "whisper-1".to_string(),
            kyc_api_url: None,
            kyc_api_key: None,
        }
    }
}
