// service/trust_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, trustdb::TrustExt, userdb::UserExt},
    models::{
        trustmodel::TrustAggregates,
        usermodel::{TrustLevel, User},
    },
    service::error::ServiceError,
};

const BASE_SCORE: f64 = 50.0;
const MAX_RATING_BONUS: f64 = 30.0;
const COMPLETION_WEIGHT: f64 = 0.25;
const POINTS_PER_PAYMENT: i64 = 2;
const MAX_PAYMENT_BONUS: i64 = 15;
const POINTS_PER_COMPLAINT: i64 = 8;

/// Penalties at or above this value zero the score and suspend the account.
pub const SUSPENSION_PENALTY: i32 = 9999;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrustInputs {
    pub avg_rating: f64,
    pub total_ratings: i64,
    /// Percentage in 0..=100.
    pub completion_rate: f64,
    pub successful_payments: i64,
    pub complaint_count: i64,
}

impl From<&TrustAggregates> for TrustInputs {
    fn from(agg: &TrustAggregates) -> Self {
        let completion_rate = if agg.finished_engagements > 0 {
            agg.completed_engagements as f64 / agg.finished_engagements as f64 * 100.0
        } else {
            0.0
        };

        TrustInputs {
            avg_rating: agg.avg_rating.unwrap_or(0.0),
            total_ratings: agg.total_ratings,
            completion_rate,
            successful_payments: agg.successful_payments,
            complaint_count: agg.complaint_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrustScore {
    pub score: i32,
    pub level: TrustLevel,
}

pub fn trust_level_for(score: i32) -> TrustLevel {
    if score >= 80 {
        TrustLevel::Trusted
    } else if score >= 60 {
        TrustLevel::Active
    } else {
        TrustLevel::Basic
    }
}

pub fn compute_trust_score(inputs: &TrustInputs) -> TrustScore {
    let rating_bonus = if inputs.total_ratings > 0 {
        ((inputs.avg_rating - 1.0) / 4.0) * MAX_RATING_BONUS
    } else {
        0.0
    };
    let completion_bonus = inputs.completion_rate * COMPLETION_WEIGHT;
    let payment_bonus = (inputs.successful_payments * POINTS_PER_PAYMENT).min(MAX_PAYMENT_BONUS);
    let complaint_penalty = inputs.complaint_count * POINTS_PER_COMPLAINT;

    let raw = BASE_SCORE + rating_bonus + completion_bonus + payment_bonus as f64
        - complaint_penalty as f64;
    let score = raw.clamp(0.0, 100.0).round() as i32;

    TrustScore {
        score,
        level: trust_level_for(score),
    }
}

/// Admin penalty: a flat deduction, not a recompute from history.
pub fn apply_penalty(current_score: i32, penalty: i32) -> TrustScore {
    let score = if penalty >= SUSPENSION_PENALTY {
        0
    } else {
        (current_score - penalty).clamp(0, 100)
    };

    TrustScore {
        score,
        level: trust_level_for(score),
    }
}

#[derive(Debug, Clone)]
pub struct TrustService {
    db_client: Arc<DBClient>,
}

impl TrustService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Rebuilds a user's score from their rating, completion, payment and
    /// complaint history and persists it.
    pub async fn recompute(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let user = self
            .db_client
            .get_user(Some(user_id), None, None)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        // Suspension pins the score at 0.
        if user.suspended {
            tracing::debug!("Skipping trust recompute for suspended user {}", user_id);
            return Ok(user);
        }

        let aggregates = self.db_client.get_trust_aggregates(user_id, user.role).await?;
        let computed = compute_trust_score(&TrustInputs::from(&aggregates));

        let mut tx = self.db_client.pool.begin().await?;

        let updated = self
            .db_client
            .set_trust_score(&mut tx, user_id, computed.score, computed.level, None)
            .await?;

        self.db_client
            .log_trust_event(
                &mut tx,
                user_id,
                "recompute",
                computed.score - user.trust_score,
                computed.score,
                &format!(
                    "avg_rating={:.2} ratings={} payments={} complaints={}",
                    aggregates.avg_rating.unwrap_or(0.0),
                    aggregates.total_ratings,
                    aggregates.successful_payments,
                    aggregates.complaint_count
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Trust score for {} recomputed: {} -> {} ({})",
            user_id,
            user.trust_score,
            computed.score,
            computed.level.to_str()
        );

        Ok(updated)
    }

    pub async fn penalize(
        &self,
        user_id: Uuid,
        penalty: i32,
        reason: String,
    ) -> Result<User, ServiceError> {
        if penalty <= 0 {
            return Err(ServiceError::Validation("Penalty must be positive".to_string()));
        }

        let user = self
            .db_client
            .get_user(Some(user_id), None, None)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        let penalized = apply_penalty(user.trust_score, penalty);
        let suspend = penalty >= SUSPENSION_PENALTY;

        let mut tx = self.db_client.pool.begin().await?;

        let updated = self
            .db_client
            .set_trust_score(
                &mut tx,
                user_id,
                penalized.score,
                penalized.level,
                suspend.then_some(true),
            )
            .await?;

        self.db_client
            .log_trust_event(
                &mut tx,
                user_id,
                "penalty",
                penalized.score - user.trust_score,
                penalized.score,
                &reason,
            )
            .await?;

        if suspend {
            self.db_client.delete_user_sessions(&mut tx, user_id).await?;
        }

        tx.commit().await?;

        tracing::warn!(
            "User {} penalized by {} (score {} -> {}, suspended: {})",
            user_id,
            penalty,
            user.trust_score,
            penalized.score,
            suspend
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TrustInputs {
        TrustInputs::default()
    }

    #[test]
    fn test_no_history_is_fifty_basic() {
        let score = compute_trust_score(&inputs());
        assert_eq!(score, TrustScore { score: 50, level: TrustLevel::Basic });
    }

    #[test]
    fn test_rating_bonus_ignored_without_ratings() {
        let score = compute_trust_score(&TrustInputs {
            avg_rating: 5.0,
            total_ratings: 0,
            ..inputs()
        });
        assert_eq!(score.score, 50);
    }

    #[test]
    fn test_perfect_rating_gives_thirty() {
        let score = compute_trust_score(&TrustInputs {
            avg_rating: 5.0,
            total_ratings: 3,
            ..inputs()
        });
        assert_eq!(score.score, 80);
        assert_eq!(score.level, TrustLevel::Trusted);
    }

    #[test]
    fn test_lowest_rating_gives_nothing() {
        let score = compute_trust_score(&TrustInputs {
            avg_rating: 1.0,
            total_ratings: 10,
            ..inputs()
        });
        assert_eq!(score.score, 50);
    }

    #[test]
    fn test_completion_and_payment_bonuses() {
        // 50 + 25 + min(10*2, 15)
        let score = compute_trust_score(&TrustInputs {
            completion_rate: 100.0,
            successful_payments: 10,
            ..inputs()
        });
        assert_eq!(score.score, 90);

        let score = compute_trust_score(&TrustInputs {
            completion_rate: 40.0,
            successful_payments: 3,
            ..inputs()
        });
        assert_eq!(score.score, 66);
        assert_eq!(score.level, TrustLevel::Active);
    }

    #[test]
    fn test_rounds_to_nearest() {
        // 50 + (3.5-1)/4*30 = 68.75
        let score = compute_trust_score(&TrustInputs {
            avg_rating: 3.5,
            total_ratings: 2,
            ..inputs()
        });
        assert_eq!(score.score, 69);
    }

    #[test]
    fn test_clamped_to_bounds() {
        let high = compute_trust_score(&TrustInputs {
            avg_rating: 5.0,
            total_ratings: 50,
            completion_rate: 100.0,
            successful_payments: 100,
            complaint_count: 0,
        });
        assert_eq!(high.score, 100);

        let low = compute_trust_score(&TrustInputs {
            complaint_count: 20,
            ..inputs()
        });
        assert_eq!(low.score, 0);
        assert_eq!(low.level, TrustLevel::Basic);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(trust_level_for(80), TrustLevel::Trusted);
        assert_eq!(trust_level_for(79), TrustLevel::Active);
        assert_eq!(trust_level_for(60), TrustLevel::Active);
        assert_eq!(trust_level_for(59), TrustLevel::Basic);
    }

    #[test]
    fn test_penalty_subtracts_directly() {
        assert_eq!(apply_penalty(72, 10), TrustScore { score: 62, level: TrustLevel::Active });
        assert_eq!(apply_penalty(5, 10).score, 0);
    }

    #[test]
    fn test_suspension_penalty_zeroes_score() {
        assert_eq!(
            apply_penalty(95, SUSPENSION_PENALTY),
            TrustScore { score: 0, level: TrustLevel::Basic }
        );
        assert_eq!(apply_penalty(95, 50_000).score, 0);
    }

    #[test]
    fn test_inputs_from_aggregates() {
        let agg = TrustAggregates {
            avg_rating: Some(4.0),
            total_ratings: 4,
            finished_engagements: 4,
            completed_engagements: 3,
            successful_payments: 2,
            complaint_count: 1,
        };
        let inputs = TrustInputs::from(&agg);
        assert_eq!(inputs.completion_rate, 75.0);
        // 50 + 22.5 + 18.75 + 4 - 8 = 87.25
        assert_eq!(compute_trust_score(&inputs).score, 87);

        let empty = TrustInputs::from(&TrustAggregates::default());
        assert_eq!(empty.completion_rate, 0.0);
    }
}
