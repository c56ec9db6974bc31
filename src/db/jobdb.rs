// db/jobdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

pub struct NewJob {
    pub title: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    pub pay_amount: i64,
    pub pay_type: PayType,
    pub city: String,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub escrow_required: bool,
    pub escrow_amount: i64,
}

#[derive(Debug, Default, Clone)]
pub struct JobSearch {
    pub status: Option<JobStatus>,
    pub category: Option<String>,
    pub skill: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub employer_id: Option<Uuid>,
    /// (latitude, longitude, radius_km)
    pub near: Option<(f64, f64, f64)>,
}

#[async_trait]
pub trait JobExt {
    async fn create_job(&self, employer_id: Uuid, job: NewJob) -> Result<Job, Error>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    /// Reads the job row `FOR UPDATE`; held until `tx` ends.
    async fn lock_job(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
    ) -> Result<Option<Job>, Error>;

    async fn search_jobs(&self, search: &JobSearch, page: u32, limit: usize)
        -> Result<Vec<Job>, Error>;

    async fn update_job_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Job, Error>;

    /// Moves escrow from `from` to `to`. `None` when the job is no longer in `from`.
    async fn set_job_escrow_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<Option<Job>, Error>;

    async fn delete_job(&self, job_id: Uuid) -> Result<(), Error>;

    // Applications
    async fn create_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        cover_note: Option<String>,
        match_score: i32,
    ) -> Result<Application, Error>;

    async fn get_application(&self, application_id: Uuid) -> Result<Option<Application>, Error>;

    async fn get_worker_applications(&self, worker_id: Uuid) -> Result<Vec<Application>, Error>;

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<Application>, Error>;

    /// The accepted or completed application on a job, if any.
    async fn get_engaged_application(&self, job_id: Uuid) -> Result<Option<Application>, Error>;

    async fn get_engaged_application_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
    ) -> Result<Option<Application>, Error>;

    /// Moves an application from `from` to `to`. `None` when it is no longer in `from`.
    async fn update_application_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        application_id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, Error>;

    // Escrow ledger
    async fn create_escrow_transaction(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        employer_id: Uuid,
        worker_id: Option<Uuid>,
        amount: i64,
        platform_fee: i64,
        kind: EscrowKind,
    ) -> Result<EscrowTransaction, Error>;

    async fn get_escrow_transactions(&self, job_id: Uuid) -> Result<Vec<EscrowTransaction>, Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn create_job(&self, employer_id: Uuid, job: NewJob) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (
                employer_id, title, description, category, skills, pay_amount, pay_type,
                city, pincode, latitude, longitude, escrow_required, escrow_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(employer_id)
        .bind(job.title)
        .bind(job.description)
        .bind(job.category)
        .bind(job.skills)
        .bind(job.pay_amount)
        .bind(job.pay_type)
        .bind(job.city)
        .bind(job.pincode)
        .bind(job.latitude)
        .bind(job.longitude)
        .bind(job.escrow_required)
        .bind(job.escrow_amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(r#"SELECT * FROM jobs WHERE id = $1"#)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn lock_job(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(r#"SELECT * FROM jobs WHERE id = $1 FOR UPDATE"#)
            .bind(job_id)
            .fetch_optional(&mut **tx)
            .await
    }

    async fn search_jobs(
        &self,
        search: &JobSearch,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Job>, Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;
        let (lat, lng, radius_km) = match search.near {
            Some((lat, lng, radius)) => (Some(lat), Some(lng), Some(radius)),
            None => (None, None, None),
        };

        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::job_status IS NULL OR status = $1)
            AND ($2::text IS NULL OR category ILIKE $2)
            AND ($3::text IS NULL OR $3 = ANY(skills))
            AND ($4::text IS NULL OR city ILIKE $4)
            AND ($5::text IS NULL OR pincode = $5)
            AND ($6::uuid IS NULL OR employer_id = $6)
            AND (
                $7::float8 IS NULL
                OR (
                    latitude IS NOT NULL AND longitude IS NOT NULL
                    AND 6371 * 2 * ASIN(SQRT(
                        POWER(SIN(RADIANS(latitude - $7) / 2), 2)
                        + COS(RADIANS($7)) * COS(RADIANS(latitude))
                        * POWER(SIN(RADIANS(longitude - $8::float8) / 2), 2)
                    )) <= $9::float8
                )
            )
            ORDER BY created_at DESC
            LIMIT $10 OFFSET $11
            "#,
        )
        .bind(search.status)
        .bind(search.category.as_deref())
        .bind(search.skill.as_ref().map(|s| s.to_lowercase()))
        .bind(search.city.as_deref())
        .bind(search.pincode.as_deref())
        .bind(search.employer_id)
        .bind(lat)
        .bind(lng)
        .bind(radius_km)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_job_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *"#,
        )
        .bind(job_id)
        .bind(status)
        .fetch_one(&mut **tx)
        .await
    }

    async fn set_job_escrow_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET escrow_status = $3, updated_at = NOW()
            WHERE id = $1 AND escrow_status = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), Error> {
        sqlx::query(r#"DELETE FROM jobs WHERE id = $1"#)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_application(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        cover_note: Option<String>,
        match_score: i32,
    ) -> Result<Application, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, worker_id, cover_note, match_score)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(cover_note)
        .bind(match_score)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_application(&self, application_id: Uuid) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(r#"SELECT * FROM applications WHERE id = $1"#)
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_worker_applications(&self, worker_id: Uuid) -> Result<Vec<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"SELECT * FROM applications WHERE worker_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE job_id = $1
            ORDER BY match_score DESC, created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_engaged_application(&self, job_id: Uuid) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE job_id = $1 AND status IN ('accepted', 'completed')
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_engaged_application_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
    ) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE job_id = $1 AND status IN ('accepted', 'completed')
            LIMIT 1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn update_application_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        application_id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, Error> {
        sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn create_escrow_transaction(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_id: Uuid,
        employer_id: Uuid,
        worker_id: Option<Uuid>,
        amount: i64,
        platform_fee: i64,
        kind: EscrowKind,
    ) -> Result<EscrowTransaction, Error> {
        sqlx::query_as::<_, EscrowTransaction>(
            r#"
            INSERT INTO escrow_transactions (job_id, employer_id, worker_id, amount, platform_fee, kind)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(employer_id)
        .bind(worker_id)
        .bind(amount)
        .bind(platform_fee)
        .bind(kind)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_escrow_transactions(&self, job_id: Uuid) -> Result<Vec<EscrowTransaction>, Error> {
        sqlx::query_as::<_, EscrowTransaction>(
            r#"SELECT * FROM escrow_transactions WHERE job_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }
}
