use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    trustmodel::SkillVerification,
    usermodel::{TrustLevel, User, UserRole},
};

lazy_static! {
    /// Indian mobile number, optionally prefixed with +91, 91 or 0.
    pub static ref PHONE_REGEX: Regex =
        Regex::new(r"^(?:\+?91[\s-]?|0)?[6-9][0-9]{4}[\s-]?[0-9]{5}$").unwrap();

    pub static ref PINCODE_REGEX: Regex = Regex::new(r"^[1-9][0-9]{5}$").unwrap();
}

/// Canonical `+91XXXXXXXXXX` form, or `None` when `raw` is not an Indian mobile.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !PHONE_REGEX.is_match(trimmed) {
        return None;
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = &digits[digits.len() - 10..];
    Some(format!("+91{}", national))
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SignupDto {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2-100 characters"))]
    pub name: String,

    #[validate(regex(path = "PHONE_REGEX", message = "Enter a valid 10-digit Indian mobile number"))]
    pub phone: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, max = 64, message = "Password must be between 6-64 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    pub role: UserRole,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginDto {
    /// Phone number or email.
    #[validate(length(min = 1, message = "Phone or email is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PhoneOtpSendDto {
    #[validate(regex(path = "PHONE_REGEX", message = "Enter a valid 10-digit Indian mobile number"))]
    pub phone: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PhoneOtpVerifyDto {
    #[validate(regex(path = "PHONE_REGEX", message = "Enter a valid 10-digit Indian mobile number"))]
    pub phone: String,

    #[validate(length(min = 4, max = 10, message = "Code must be between 4-10 digits"))]
    pub code: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct EmailOtpSendDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct EmailOtpVerifyDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 20, message = "At most 20 skills"))]
    pub skills: Option<Vec<String>>,

    #[validate(length(min = 2, max = 100, message = "City must be between 2-100 characters"))]
    pub city: Option<String>,

    #[validate(regex(path = "PINCODE_REGEX", message = "Pincode must be 6 digits"))]
    pub pincode: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

/// Public view of another user; no contact details.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicProfileDto {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub trust_score: i32,
    pub trust_level: TrustLevel,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub city: Option<String>,
    pub phone_verified: bool,
    pub pan_verified: bool,
    pub gstin_verified: bool,
    pub profile_complete: bool,
    pub verified_skills: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl PublicProfileDto {
    pub fn from_user(user: &User, verified: &[SkillVerification]) -> Self {
        PublicProfileDto {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
            trust_score: user.trust_score,
            trust_level: user.trust_level,
            bio: user.bio.clone(),
            skills: user.skills.clone(),
            city: user.city.clone(),
            phone_verified: user.phone_verified,
            pan_verified: user.pan_verified,
            gstin_verified: user.gstin_verified,
            profile_complete: user.profile_complete,
            verified_skills: verified.iter().map(|v| v.skill.clone()).collect(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponseDto {
    pub status: String,
    pub token: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<User>,
    pub results: i64,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
