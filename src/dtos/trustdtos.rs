use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::trustmodel::{Rating, Report, ReportStatus};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateRatingDto {
    pub job_id: Uuid,
    pub ratee_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Score must be between 1 and 5"))]
    pub score: i16,

    #[validate(length(max = 1000, message = "Comment must be at most 1000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingQueryDto {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RatingListResponseDto {
    pub status: &'static str,
    pub ratings: Vec<Rating>,
    pub average: Option<f64>,
    pub results: usize,
}

impl RatingListResponseDto {
    pub fn new(ratings: Vec<Rating>) -> Self {
        let average = if ratings.is_empty() {
            None
        } else {
            let total: i64 = ratings.iter().map(|r| r.score as i64).sum();
            Some((total as f64 / ratings.len() as f64 * 100.0).round() / 100.0)
        };

        RatingListResponseDto {
            status: "success",
            results: ratings.len(),
            average,
            ratings,
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportDto {
    pub reported_user_id: Uuid,
    pub job_id: Option<Uuid>,

    #[validate(length(min = 3, max = 100, message = "Reason must be between 3-100 characters"))]
    pub reason: String,

    #[validate(length(min = 10, max = 2000, message = "Description must be between 10-2000 characters"))]
    pub description: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ReportQueryDto {
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponseDto {
    pub status: &'static str,
    pub reports: Vec<Report>,
    pub results: usize,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ResolveReportDto {
    pub status: ReportStatus,

    #[validate(length(min = 3, max = 2000, message = "Resolution must be between 3-2000 characters"))]
    pub resolution: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct PenalizeDto {
    pub user_id: Uuid,

    #[validate(range(min = 1, message = "Penalty must be positive"))]
    pub penalty: i32,

    #[validate(length(min = 3, max = 500, message = "Reason must be between 3-500 characters"))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rating(score: i16) -> Rating {
        Rating {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            rater_id: Uuid::new_v4(),
            ratee_id: Uuid::new_v4(),
            score,
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rating_score_bounds() {
        let dto = CreateRatingDto {
            job_id: Uuid::new_v4(),
            ratee_id: Uuid::new_v4(),
            score: 6,
            comment: None,
        };
        assert!(dto.validate().is_err());
        assert!(CreateRatingDto { score: 5, ..dto.clone() }.validate().is_ok());
        assert!(CreateRatingDto { score: 0, ..dto }.validate().is_err());
    }

    #[test]
    fn test_rating_average() {
        let response = RatingListResponseDto::new(vec![rating(5), rating(4), rating(4)]);
        assert_eq!(response.average, Some(4.33));
        assert_eq!(response.results, 3);

        assert_eq!(RatingListResponseDto::new(vec![]).average, None);
    }

    #[test]
    fn test_penalty_must_be_positive() {
        let dto = PenalizeDto {
            user_id: Uuid::new_v4(),
            penalty: 0,
            reason: "Repeated no-shows".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
