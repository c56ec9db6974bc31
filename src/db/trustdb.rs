// db/trustdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{
    trustmodel::*,
    usermodel::{TrustLevel, User, UserRole},
};

#[async_trait]
pub trait TrustExt {
    // Ratings
    async fn rating_exists(&self, rater_id: Uuid, ratee_id: Uuid, job_id: Uuid)
        -> Result<bool, Error>;

    async fn create_rating(
        &self,
        job_id: Uuid,
        rater_id: Uuid,
        ratee_id: Uuid,
        score: i16,
        comment: Option<String>,
    ) -> Result<Rating, Error>;

    async fn get_ratings_for_user(&self, ratee_id: Uuid) -> Result<Vec<Rating>, Error>;

    // Reports
    async fn create_report(
        &self,
        reporter_id: Uuid,
        reported_user_id: Uuid,
        job_id: Option<Uuid>,
        reason: String,
        description: String,
    ) -> Result<Report, Error>;

    async fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, Error>;

    async fn get_reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>, Error>;

    async fn get_reports_by_reporter(&self, reporter_id: Uuid) -> Result<Vec<Report>, Error>;

    async fn resolve_report(
        &self,
        report_id: Uuid,
        status: ReportStatus,
        resolution: String,
        resolved_by: Uuid,
    ) -> Result<Report, Error>;

    // Trust score
    async fn get_trust_aggregates(&self, user_id: Uuid, role: UserRole)
        -> Result<TrustAggregates, Error>;

    async fn set_trust_score(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        score: i32,
        level: TrustLevel,
        suspended: Option<bool>,
    ) -> Result<User, Error>;

    async fn log_trust_event(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        category: &str,
        delta: i32,
        score_after: i32,
        reason: &str,
    ) -> Result<TrustEvent, Error>;

    // Skill verification
    async fn create_skill_verification(
        &self,
        user_id: Uuid,
        skill: &str,
        method: VerificationMethod,
        score: i32,
        passed: bool,
        transcript: Option<String>,
        feedback: String,
    ) -> Result<SkillVerification, Error>;

    async fn get_verified_skills(&self, user_id: Uuid) -> Result<Vec<SkillVerification>, Error>;
}

#[async_trait]
impl TrustExt for DBClient {
    async fn rating_exists(
        &self,
        rater_id: Uuid,
        ratee_id: Uuid,
        job_id: Uuid,
    ) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM ratings
                WHERE rater_id = $1 AND ratee_id = $2 AND job_id = $3
            )
            "#,
        )
        .bind(rater_id)
        .bind(ratee_id)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_rating(
        &self,
        job_id: Uuid,
        rater_id: Uuid,
        ratee_id: Uuid,
        score: i16,
        comment: Option<String>,
    ) -> Result<Rating, Error> {
        sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (job_id, rater_id, ratee_id, score, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(rater_id)
        .bind(ratee_id)
        .bind(score)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_ratings_for_user(&self, ratee_id: Uuid) -> Result<Vec<Rating>, Error> {
        sqlx::query_as::<_, Rating>(
            r#"SELECT * FROM ratings WHERE ratee_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(ratee_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_report(
        &self,
        reporter_id: Uuid,
        reported_user_id: Uuid,
        job_id: Option<Uuid>,
        reason: String,
        description: String,
    ) -> Result<Report, Error> {
        sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (reporter_id, reported_user_id, job_id, reason, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(reporter_id)
        .bind(reported_user_id)
        .bind(job_id)
        .bind(reason)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, Error> {
        sqlx::query_as::<_, Report>(r#"SELECT * FROM reports WHERE id = $1"#)
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>, Error> {
        sqlx::query_as::<_, Report>(
            r#"
            SELECT * FROM reports
            WHERE ($1::report_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_reports_by_reporter(&self, reporter_id: Uuid) -> Result<Vec<Report>, Error> {
        sqlx::query_as::<_, Report>(
            r#"SELECT * FROM reports WHERE reporter_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(reporter_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn resolve_report(
        &self,
        report_id: Uuid,
        status: ReportStatus,
        resolution: String,
        resolved_by: Uuid,
    ) -> Result<Report, Error> {
        sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET status = $2, resolution = $3, resolved_by = $4, resolved_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(report_id)
        .bind(status)
        .bind(resolution)
        .bind(resolved_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_trust_aggregates(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<TrustAggregates, Error> {
        // Workers are measured on applications, employers on the jobs they posted.
        let is_worker = role == UserRole::Worker;

        sqlx::query_as::<_, TrustAggregates>(
            r#"
            SELECT
                (SELECT AVG(score)::float8 FROM ratings WHERE ratee_id = $1) AS avg_rating,
                (SELECT COUNT(*) FROM ratings WHERE ratee_id = $1) AS total_ratings,
                CASE WHEN $2 THEN
                    (SELECT COUNT(*) FROM applications
                     WHERE worker_id = $1 AND status IN ('accepted', 'completed'))
                ELSE
                    (SELECT COUNT(*) FROM jobs
                     WHERE employer_id = $1 AND status IN ('in_progress', 'completed', 'closed'))
                END AS finished_engagements,
                CASE WHEN $2 THEN
                    (SELECT COUNT(*) FROM applications WHERE worker_id = $1 AND status = 'completed')
                ELSE
                    (SELECT COUNT(*) FROM jobs WHERE employer_id = $1 AND status = 'completed')
                END AS completed_engagements,
                (SELECT COUNT(*) FROM escrow_transactions
                 WHERE kind = 'release' AND status = 'completed'
                 AND (employer_id = $1 OR worker_id = $1)) AS successful_payments,
                (SELECT COUNT(*) FROM reports
                 WHERE reported_user_id = $1 AND status = 'resolved') AS complaint_count
            "#,
        )
        .bind(user_id)
        .bind(is_worker)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_trust_score(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        score: i32,
        level: TrustLevel,
        suspended: Option<bool>,
    ) -> Result<User, Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET trust_score = $2, trust_level = $3,
                suspended = COALESCE($4, suspended), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(score)
        .bind(level)
        .bind(suspended)
        .fetch_one(&mut **tx)
        .await
    }

    async fn log_trust_event(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        category: &str,
        delta: i32,
        score_after: i32,
        reason: &str,
    ) -> Result<TrustEvent, Error> {
        sqlx::query_as::<_, TrustEvent>(
            r#"
            INSERT INTO trust_events (user_id, category, delta, score_after, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(delta)
        .bind(score_after)
        .bind(reason)
        .fetch_one(&mut **tx)
        .await
    }

    async fn create_skill_verification(
        &self,
        user_id: Uuid,
        skill: &str,
        method: VerificationMethod,
        score: i32,
        passed: bool,
        transcript: Option<String>,
        feedback: String,
    ) -> Result<SkillVerification, Error> {
        sqlx::query_as::<_, SkillVerification>(
            r#"
            INSERT INTO skill_verifications (user_id, skill, method, score, passed, transcript, feedback)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(skill)
        .bind(method)
        .bind(score)
        .bind(passed)
        .bind(transcript)
        .bind(feedback)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_verified_skills(&self, user_id: Uuid) -> Result<Vec<SkillVerification>, Error> {
        sqlx::query_as::<_, SkillVerification>(
            r#"
            SELECT DISTINCT ON (skill) *
            FROM skill_verifications
            WHERE user_id = $1 AND passed = TRUE
            ORDER BY skill, score DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
