use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Worker,
    Employer,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Worker => "worker",
            UserRole::Employer => "employer",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "trust_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Basic,
    Active,
    Trusted,
}

impl TrustLevel {
    pub fn to_str(&self) -> &str {
        match self {
            TrustLevel::Basic => "basic",
            TrustLevel::Active => "active",
            TrustLevel::Trusted => "trusted",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
    pub phone_verified: bool,
    pub email_verified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
    pub pan_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    pub gstin_verified: bool,

    pub trust_score: i32,
    pub trust_level: TrustLevel,

    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub profile_complete: bool,
    pub suspended: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// A profile counts as complete once the marketplace can match on it.
    pub fn compute_profile_complete(&self) -> bool {
        let has_location = self.city.as_deref().map_or(false, |c| !c.trim().is_empty())
            || (self.latitude.is_some() && self.longitude.is_some());

        match self.role {
            UserRole::Worker => {
                has_location
                    && !self.skills.is_empty()
                    && self.bio.as_deref().map_or(false, |b| !b.trim().is_empty())
            }
            UserRole::Employer => has_location,
            UserRole::Admin => true,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
pub(crate) fn sample_user(role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Ravi Kumar".to_string(),
        phone: "+919876543210".to_string(),
        email: Some("ravi@example.com".to_string()),
        password: "hash".to_string(),
        role,
        phone_verified: true,
        email_verified: false,
        pan_number: None,
        pan_verified: false,
        gstin: None,
        gstin_verified: false,
        trust_score: 50,
        trust_level: TrustLevel::Basic,
        bio: None,
        skills: vec![],
        city: None,
        pincode: None,
        latitude: None,
        longitude: None,
        profile_complete: false,
        suspended: false,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_profile_needs_skills_bio_and_location() {
        let mut user = sample_user(UserRole::Worker);
        assert!(!user.compute_profile_complete());

        user.skills = vec!["plumbing".to_string()];
        user.bio = Some("10 years fixing pipes".to_string());
        assert!(!user.compute_profile_complete());

        user.city = Some("Pune".to_string());
        assert!(user.compute_profile_complete());
    }

    #[test]
    fn test_employer_profile_needs_location_only() {
        let mut user = sample_user(UserRole::Employer);
        user.latitude = Some(18.52);
        user.longitude = Some(73.85);
        assert!(user.compute_profile_complete());
    }

    #[test]
    fn test_password_never_serialized() {
        let user = sample_user(UserRole::Worker);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "worker");
        assert_eq!(json["trust_level"], "basic");
    }
}
