// service/kyc_service.rs
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::Config, service::error::ServiceError, utils::http_retry::send_with_retry};

lazy_static! {
    /// Five letters, four digits, one letter.
    pub static ref PAN_REGEX: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();

    /// State code, embedded PAN, entity number, 'Z', check character.
    pub static ref GSTIN_REGEX: Regex =
        Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").unwrap();
}

const GSTIN_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn is_valid_pan(pan: &str) -> bool {
    PAN_REGEX.is_match(pan)
}

fn is_valid_state_code(code: u32) -> bool {
    (1..=38).contains(&code) || code == 97
}

fn gstin_check_char(first_14: &str) -> Option<char> {
    let mut sum = 0u32;
    for (i, c) in first_14.chars().enumerate() {
        let value = GSTIN_CHARSET.find(c)? as u32;
        let product = value * if i % 2 == 0 { 1 } else { 2 };
        sum += product / 36 + product % 36;
    }
    GSTIN_CHARSET.chars().nth(((36 - sum % 36) % 36) as usize)
}

/// Format, state code and mod-36 check character.
pub fn validate_gstin(gstin: &str) -> Result<(), ServiceError> {
    if !GSTIN_REGEX.is_match(gstin) {
        return Err(ServiceError::Validation(
            "GSTIN must be 15 characters, e.g. 27AAPFU0939F1ZV".to_string(),
        ));
    }

    let state_code: u32 = gstin[..2].parse().unwrap_or(0);
    if !is_valid_state_code(state_code) {
        return Err(ServiceError::Validation(format!(
            "GSTIN has an unknown state code {:02}",
            state_code
        )));
    }

    if gstin_check_char(&gstin[..14]) != gstin.chars().nth(14) {
        return Err(ServiceError::Validation(
            "GSTIN check character does not match".to_string(),
        ));
    }

    Ok(())
}

/// Every word of the claimed name must appear in the registered name.
pub fn names_match(claimed: &str, registered: &str) -> bool {
    let registered: Vec<String> = registered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase())
        .collect();

    let mut words = claimed
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase())
        .filter(|w| !w.is_empty())
        .peekable();

    words.peek().is_some() && words.all(|w| registered.contains(&w))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KycLookup {
    pub valid: bool,
    #[serde(default)]
    pub registered_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KycService {
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl KycService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config
                .kyc_api_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_key: config.kyc_api_key.clone(),
        }
    }

    async fn lookup(&self, path: &str, body: serde_json::Value) -> Result<KycLookup, ServiceError> {
        let (base_url, api_key) = match (&self.base_url, &self.api_key) {
            (Some(url), Some(key)) => (url, key),
            _ => return Err(ServiceError::NotConfigured("KYC provider")),
        };
        let url = format!("{}/{}", base_url, path);

        let response = send_with_retry("KYC", || {
            self.http
                .post(&url)
                .header("x-api-key", api_key)
                .json(&body)
        })
        .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "KYC provider returned {}",
                response.status()
            )));
        }

        Ok(response.json::<KycLookup>().await?)
    }

    pub async fn verify_pan(&self, pan: &str, name: &str) -> Result<KycLookup, ServiceError> {
        if !is_valid_pan(pan) {
            return Err(ServiceError::Validation(
                "PAN must be in the format AAAAA9999A".to_string(),
            ));
        }

        let lookup = self.lookup("pan/verify", json!({ "pan": pan, "name": name })).await?;

        if !lookup.valid {
            return Err(ServiceError::Validation("PAN could not be verified".to_string()));
        }
        if let Some(registered) = lookup.registered_name.as_deref() {
            if !names_match(name, registered) {
                return Err(ServiceError::Validation(
                    "Name does not match PAN records".to_string(),
                ));
            }
        }

        Ok(lookup)
    }

    pub async fn verify_gstin(&self, gstin: &str) -> Result<KycLookup, ServiceError> {
        validate_gstin(gstin)?;

        let lookup = self.lookup("gstin/verify", json!({ "gstin": gstin })).await?;

        let active = lookup
            .status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("active"));
        if !lookup.valid || !active {
            return Err(ServiceError::Validation(
                "GSTIN is not registered or not active".to_string(),
            ));
        }

        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[test]
    fn test_pan_format() {
        assert!(is_valid_pan("ABCPE1234F"));
        assert!(!is_valid_pan("ABCPE1234"));
        assert!(!is_valid_pan("abcpe1234f"));
        assert!(!is_valid_pan("ABCP51234F"));
        assert!(is_valid_pan(&normalize_id(" abcpe1234f ")));
    }

    #[test]
    fn test_gstin_validation() {
        assert!(validate_gstin("27AAPFU0939F1ZV").is_ok());
        assert!(validate_gstin("29AAGCB7383J1Z4").is_ok());
        // bad check character
        assert!(validate_gstin("27AAPFU0939F1ZA").is_err());
        // state code 45 does not exist
        assert!(validate_gstin("45AAPFU0939F1ZV").is_err());
        assert!(validate_gstin("27AAPFU0939F1Z").is_err());
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Ravi Kumar", "RAVI KUMAR SHARMA"));
        assert!(names_match("ravi  kumar.", "Ravi Kumar"));
        assert!(!names_match("Ravi Verma", "RAVI KUMAR"));
        assert!(!names_match("  ", "RAVI KUMAR"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let svc = KycService::new(&Config::for_tests());
        let err = svc.verify_pan("ABCPE1234F", "Ravi").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));

        // format is checked before the provider
        let err = svc.verify_pan("BAD", "Ravi").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_pan_lookup_checks_name() {
        let app = Router::new().route(
            "/pan/verify",
            post(|| async {
                Json(serde_json::json!({ "valid": true, "registered_name": "ASHA DEVI PATIL" }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let svc = KycService {
            http: reqwest::Client::new(),
            base_url: Some(format!("http://{}", addr)),
            api_key: Some("key".to_string()),
        };

        assert!(svc.verify_pan("ABCPE1234F", "Asha Patil").await.is_ok());
        assert!(svc.verify_pan("ABCPE1234F", "Meena Patil").await.is_err());
    }
}
