// service/matching_service.rs
use std::collections::HashSet;

use crate::{
    models::{jobmodel::Job, usermodel::User},
    utils::geo::haversine_km,
};

const SKILL_WEIGHT: f64 = 70.0;
const LOCATION_WEIGHT: f64 = 20.0;
const TRUST_WEIGHT: f64 = 10.0;
/// Workers this close to the job get half the location points.
const NEARBY_KM: f64 = 10.0;

/// Lowercases, trims and de-duplicates skill tags, keeping first-seen order.
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

fn skill_overlap(job_skills: &[String], worker_skills: &[String]) -> f64 {
    if job_skills.is_empty() {
        return 1.0;
    }

    let worker: HashSet<String> = worker_skills.iter().map(|s| s.to_lowercase()).collect();
    let matched = job_skills
        .iter()
        .filter(|s| worker.contains(&s.to_lowercase()))
        .count();

    matched as f64 / job_skills.len() as f64
}

fn location_affinity(job: &Job, worker: &User) -> f64 {
    let same_pincode = matches!(
        (job.pincode.as_deref(), worker.pincode.as_deref()),
        (Some(a), Some(b)) if a == b
    );
    let same_city = worker
        .city
        .as_deref()
        .map_or(false, |c| c.trim().eq_ignore_ascii_case(job.city.trim()));

    if same_pincode || same_city {
        return 1.0;
    }

    match (job.latitude, job.longitude, worker.latitude, worker.longitude) {
        (Some(jl), Some(jg), Some(wl), Some(wg)) if haversine_km(jl, jg, wl, wg) <= NEARBY_KM => 0.5,
        _ => 0.0,
    }
}

/// Match score in 0..=100: skill overlap 70, same locality 20, trust 10.
pub fn compute_match_score(job: &Job, worker: &User) -> i32 {
    let skills = skill_overlap(&job.skills, &worker.skills) * SKILL_WEIGHT;
    let location = location_affinity(job, worker) * LOCATION_WEIGHT;
    let trust = worker.trust_score.clamp(0, 100) as f64 / 100.0 * TRUST_WEIGHT;

    (skills + location + trust).round().clamp(0.0, 100.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        jobmodel::{EscrowStatus, JobStatus, PayType},
        usermodel::{sample_user, UserRole},
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn job(skills: &[&str], city: &str) -> Job {
        Job {
            id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            title: "Fix kitchen sink".to_string(),
            description: "Leaking pipe under the sink".to_string(),
            category: "plumbing".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            pay_amount: 80_000,
            pay_type: PayType::Fixed,
            city: city.to_string(),
            pincode: Some("411038".to_string()),
            latitude: Some(18.5074),
            longitude: Some(73.8077),
            escrow_required: false,
            escrow_amount: 0,
            escrow_status: EscrowStatus::None,
            status: JobStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn worker(skills: &[&str], city: Option<&str>, trust: i32) -> User {
        let mut user = sample_user(UserRole::Worker);
        user.skills = skills.iter().map(|s| s.to_string()).collect();
        user.city = city.map(str::to_string);
        user.trust_score = trust;
        user
    }

    #[test]
    fn test_perfect_match_is_hundred() {
        let score = compute_match_score(
            &job(&["plumbing", "pipe fitting"], "Pune"),
            &worker(&["Plumbing", "pipe fitting"], Some("pune"), 100),
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_partial_skills_other_city() {
        // 70 * 1/2 + 0 + 5
        let score = compute_match_score(
            &job(&["plumbing", "tiling"], "Pune"),
            &worker(&["plumbing"], Some("Mumbai"), 50),
        );
        assert_eq!(score, 40);
    }

    #[test]
    fn test_nearby_coordinates_give_half_location() {
        let mut w = worker(&[], None, 0);
        w.pincode = None;
        w.latitude = Some(18.5204);
        w.longitude = Some(73.8567);
        // 0 skills of 1, ~5 km away
        assert_eq!(compute_match_score(&job(&["tiling"], "Pune"), &w), 10);
    }

    #[test]
    fn test_job_without_skills_counts_as_full_overlap() {
        let score = compute_match_score(&job(&[], "Nagpur"), &worker(&[], None, 0));
        assert_eq!(score, 70);
    }

    #[test]
    fn test_score_bounds() {
        let w = worker(&["x"], None, 0);
        let mut j = job(&["y"], "Delhi");
        j.latitude = None;
        assert_eq!(compute_match_score(&j, &w), 0);
    }

    #[test]
    fn test_normalize_skills() {
        let skills = vec![
            " Plumbing ".to_string(),
            "plumbing".to_string(),
            "".to_string(),
            "Tiling".to_string(),
        ];
        assert_eq!(normalize_skills(&skills), vec!["plumbing", "tiling"]);
    }
}
