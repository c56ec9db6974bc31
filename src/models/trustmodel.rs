use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub job_id: Uuid,
    pub rater_id: Uuid,
    pub ratee_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub reason: String,
    pub description: String,
    pub status: ReportStatus,
    pub resolution: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct TrustEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub delta: i32,
    pub score_after: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Raw history the trust formula is computed from.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct TrustAggregates {
    pub avg_rating: Option<f64>,
    pub total_ratings: i64,
    pub finished_engagements: i64,
    pub completed_engagements: i64,
    pub successful_payments: i64,
    pub complaint_count: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "verification_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Quiz,
    Video,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct SkillVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill: String,
    pub method: VerificationMethod,
    pub score: i32,
    pub passed: bool,
    pub transcript: Option<String>,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}
