use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::userdtos::PINCODE_REGEX;
use crate::{
    db::jobdb::{JobSearch, NewJob},
    models::jobmodel::{Application, ApplicationStatus, EscrowTransaction, Job, JobStatus, PayType},
    service::{escrow_service::EscrowAction, matching_service::normalize_skills},
    utils::{
        currency::{format_paise_as_rupees, rupees_to_paise},
        geo::haversine_km,
    },
};

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobDto {
    #[validate(length(min = 5, max = 150, message = "Title must be between 5-150 characters"))]
    pub title: String,

    #[validate(length(min = 20, max = 5000, message = "Description must be between 20-5000 characters"))]
    pub description: String,

    #[validate(length(min = 2, max = 60, message = "Category is required"))]
    pub category: String,

    #[validate(length(max = 20, message = "At most 20 skills"))]
    #[serde(default)]
    pub skills: Vec<String>,

    /// Rupees.
    #[validate(range(min = 1.0, message = "Pay must be at least ₹1"))]
    pub pay_amount: f64,

    pub pay_type: PayType,

    #[validate(length(min = 2, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(regex(path = "PINCODE_REGEX", message = "Pincode must be 6 digits"))]
    pub pincode: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub escrow_required: bool,

    /// Rupees; defaults to the pay amount when escrow is required.
    #[validate(range(min = 1.0, message = "Escrow amount must be at least ₹1"))]
    pub escrow_amount: Option<f64>,
}

impl CreateJobDto {
    pub fn into_new_job(self) -> NewJob {
        let pay_amount = rupees_to_paise(self.pay_amount);
        let escrow_amount = if self.escrow_required {
            self.escrow_amount.map(rupees_to_paise).unwrap_or(pay_amount)
        } else {
            0
        };

        NewJob {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_lowercase(),
            skills: normalize_skills(&self.skills),
            pay_amount,
            pay_type: self.pay_type,
            city: self.city.trim().to_string(),
            pincode: self.pincode,
            latitude: self.latitude,
            longitude: self.longitude,
            escrow_required: self.escrow_required,
            escrow_amount,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct JobQueryDto {
    pub status: Option<JobStatus>,
    pub category: Option<String>,
    pub skill: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub employer_id: Option<Uuid>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    #[validate(range(min = 0.1, max = 200.0, message = "Radius must be between 0.1-200 km"))]
    pub radius_km: Option<f64>,

    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

impl JobQueryDto {
    pub fn origin(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }

    /// Listing defaults to active jobs.
    pub fn to_search(&self) -> JobSearch {
        JobSearch {
            status: Some(self.status.unwrap_or(JobStatus::Active)),
            category: self.category.as_ref().map(|c| c.trim().to_lowercase()),
            skill: self.skill.clone(),
            city: self.city.clone(),
            pincode: self.pincode.clone(),
            employer_id: self.employer_id,
            near: self
                .origin()
                .map(|(lat, lng)| (lat, lng, self.radius_km.unwrap_or(DEFAULT_RADIUS_KM))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateJobStatusDto {
    pub status: JobStatus,
}

/// A job plus display fields derived from it.
#[derive(Debug, Serialize)]
pub struct JobResponseDto {
    #[serde(flatten)]
    pub job: Job,
    pub pay_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl JobResponseDto {
    pub fn from_job(job: Job, origin: Option<(f64, f64)>) -> Self {
        let distance_km = match (origin, job.latitude.zip(job.longitude)) {
            (Some((lat, lng)), Some((job_lat, job_lng))) => {
                Some((haversine_km(lat, lng, job_lat, job_lng) * 10.0).round() / 10.0)
            }
            _ => None,
        };

        JobResponseDto {
            pay_display: format_paise_as_rupees(job.pay_amount),
            escrow_display: job
                .escrow_required
                .then(|| format_paise_as_rupees(job.escrow_amount)),
            distance_km,
            job,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponseDto {
    pub status: &'static str,
    pub jobs: Vec<JobResponseDto>,
    pub results: usize,
    pub page: u32,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationDto {
    pub job_id: Uuid,

    #[validate(length(max = 1000, message = "Cover note must be at most 1000 characters"))]
    pub cover_note: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ApplicationQueryDto {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateApplicationStatusDto {
    pub status: ApplicationStatus,
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponseDto {
    pub status: &'static str,
    pub applications: Vec<Application>,
    pub results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowActionDto {
    pub job_id: Uuid,
    pub action: EscrowAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowQueryDto {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EscrowTransactionsResponseDto {
    pub status: &'static str,
    pub transactions: Vec<EscrowTransaction>,
    pub results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dto() -> CreateJobDto {
        CreateJobDto {
            title: "Fix kitchen sink".to_string(),
            description: "Leaking pipe under the kitchen sink needs replacing".to_string(),
            category: " Plumbing ".to_string(),
            skills: vec!["Plumbing".to_string(), "plumbing ".to_string()],
            pay_amount: 750.5,
            pay_type: PayType::Fixed,
            city: "Pune".to_string(),
            pincode: Some("411001".to_string()),
            latitude: None,
            longitude: None,
            escrow_required: true,
            escrow_amount: None,
        }
    }

    #[test]
    fn test_create_job_converts_to_paise() {
        let dto = create_dto();
        assert!(dto.validate().is_ok());

        let job = dto.into_new_job();
        assert_eq!(job.pay_amount, 75050);
        assert_eq!(job.escrow_amount, 75050);
        assert_eq!(job.category, "plumbing");
        assert_eq!(job.skills, vec!["plumbing".to_string()]);
    }

    #[test]
    fn test_escrow_amount_zero_without_escrow() {
        let dto = CreateJobDto {
            escrow_required: false,
            escrow_amount: Some(500.0),
            ..create_dto()
        };
        assert_eq!(dto.into_new_job().escrow_amount, 0);
    }

    #[test]
    fn test_rejects_short_title_and_zero_pay() {
        let dto = CreateJobDto {
            title: "Fix".to_string(),
            pay_amount: 0.0,
            ..create_dto()
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("pay_amount"));
    }

    #[test]
    fn test_query_defaults_to_active_and_radius() {
        let query = JobQueryDto {
            lat: Some(18.52),
            lng: Some(73.85),
            ..Default::default()
        };
        let search = query.to_search();
        assert_eq!(search.status, Some(JobStatus::Active));
        assert_eq!(search.near, Some((18.52, 73.85, DEFAULT_RADIUS_KM)));

        let search = JobQueryDto::default().to_search();
        assert!(search.near.is_none());
    }
}
