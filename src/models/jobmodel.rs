use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "pay_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayType {
    Fixed,
    Hourly,
    Daily,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    InProgress,
    Completed,
    Cancelled,
    Closed,
}

impl JobStatus {
    /// Transitions an owner may request through the status endpoint.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Active, JobStatus::InProgress)
                | (JobStatus::Active, JobStatus::Cancelled)
                | (JobStatus::Active, JobStatus::Closed)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Cancelled)
                | (JobStatus::Closed, JobStatus::Active)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "escrow_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    None,
    Held,
    Released,
    Refunded,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Pending, ApplicationStatus::Accepted)
                | (ApplicationStatus::Pending, ApplicationStatus::Rejected)
                | (ApplicationStatus::Pending, ApplicationStatus::Withdrawn)
                | (ApplicationStatus::Accepted, ApplicationStatus::Completed)
                | (ApplicationStatus::Accepted, ApplicationStatus::Withdrawn)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "escrow_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowKind {
    Hold,
    Release,
    Refund,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    /// In paise.
    pub pay_amount: i64,
    pub pay_type: PayType,
    pub city: String,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub escrow_required: bool,
    /// In paise.
    pub escrow_amount: i64,
    pub escrow_status: EscrowStatus,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub cover_note: Option<String>,
    pub status: ApplicationStatus,
    pub match_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EscrowTransaction {
    pub id: Uuid,
    pub job_id: Uuid,
    pub employer_id: Uuid,
    pub worker_id: Option<Uuid>,
    pub amount: i64,
    pub platform_fee: i64,
    pub kind: EscrowKind,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) fn sample_job(employer_id: Uuid) -> Job {
    let now = Utc::now();
    Job {
        id: Uuid::new_v4(),
        employer_id,
        title: "Fix kitchen sink".to_string(),
        description: "Leaking pipe under the kitchen sink needs replacing".to_string(),
        category: "plumbing".to_string(),
        skills: vec!["plumbing".to_string()],
        pay_amount: 80_000,
        pay_type: PayType::Fixed,
        city: "Pune".to_string(),
        pincode: Some("411001".to_string()),
        latitude: None,
        longitude: None,
        escrow_required: false,
        escrow_amount: 0,
        escrow_status: EscrowStatus::None,
        status: JobStatus::Active,
        created_at: now,
        updated_at: now,
    }
}
