// service/escrow_service.rs
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::JobExt},
    models::{
        jobmodel::*,
        usermodel::{User, UserRole},
    },
    service::{error::ServiceError, trust_service::TrustService},
    utils::currency::{format_paise_as_rupees, split_platform_fee},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EscrowAction {
    Hold,
    Release,
    Refund,
}

impl EscrowAction {
    fn kind(&self) -> EscrowKind {
        match self {
            EscrowAction::Hold => EscrowKind::Hold,
            EscrowAction::Release => EscrowKind::Release,
            EscrowAction::Refund => EscrowKind::Refund,
        }
    }
}

/// Status the job's escrow moves to for `action`, or why it cannot.
pub fn next_escrow_status(
    current: EscrowStatus,
    action: EscrowAction,
) -> Result<EscrowStatus, ServiceError> {
    match (current, action) {
        (EscrowStatus::None, EscrowAction::Hold) => Ok(EscrowStatus::Held),
        (EscrowStatus::Held, EscrowAction::Release) => Ok(EscrowStatus::Released),
        (EscrowStatus::Held, EscrowAction::Refund) => Ok(EscrowStatus::Refunded),
        (from, action) => Err(ServiceError::InvalidEscrowTransition(format!(
            "Cannot {:?} escrow in state {:?}",
            action, from
        ))),
    }
}

/// Checks that `actor` may perform `action` on `job`. `has_engaged_worker`
/// is true once an application on the job has been accepted.
pub fn authorize_escrow_action(
    action: EscrowAction,
    job: &Job,
    actor: &User,
    has_engaged_worker: bool,
) -> Result<(), ServiceError> {
    let is_owner = job.employer_id == actor.id;
    let is_admin = actor.role == UserRole::Admin;

    let allowed = match action {
        EscrowAction::Hold => is_owner,
        EscrowAction::Release => is_owner || is_admin,
        EscrowAction::Refund => is_admin || (is_owner && !has_engaged_worker),
    };

    if allowed {
        Ok(())
    } else {
        Err(ServiceError::UnauthorizedJobAccess(actor.id, job.id))
    }
}

/// What an escrow action will write: the next status and the ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowPlan {
    pub next_status: EscrowStatus,
    pub worker_id: Option<Uuid>,
    pub amount: i64,
    pub platform_fee: i64,
}

/// Checks `action` against the job as currently locked and works out the
/// ledger entry. `engaged_worker` is the accepted or completed worker, if any.
pub fn plan_escrow_action(
    action: EscrowAction,
    job: &Job,
    actor: &User,
    engaged_worker: Option<Uuid>,
    platform_fee_percent: i64,
) -> Result<EscrowPlan, ServiceError> {
    authorize_escrow_action(action, job, actor, engaged_worker.is_some())?;

    if action == EscrowAction::Hold {
        if !job.escrow_required {
            return Err(ServiceError::Validation(
                "This job was not posted with escrow".to_string(),
            ));
        }
        if job.escrow_amount <= 0 {
            return Err(ServiceError::Validation(
                "Escrow amount must be greater than zero".to_string(),
            ));
        }
    }

    let next_status = next_escrow_status(job.escrow_status, action)?;

    let plan = match action {
        EscrowAction::Release => {
            let worker_id = engaged_worker.ok_or_else(|| {
                ServiceError::Validation("No accepted worker to release payment to".to_string())
            })?;
            let (fee, payout) = split_platform_fee(job.escrow_amount, platform_fee_percent);
            EscrowPlan {
                next_status,
                worker_id: Some(worker_id),
                amount: payout,
                platform_fee: fee,
            }
        }
        _ => EscrowPlan {
            next_status,
            worker_id: None,
            amount: job.escrow_amount,
            platform_fee: 0,
        },
    };

    Ok(plan)
}

#[derive(Debug, Clone, Serialize)]
pub struct EscrowOutcome {
    pub job: Job,
    pub transaction: EscrowTransaction,
}

#[derive(Debug, Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
    trust_service: Arc<TrustService>,
    platform_fee_percent: i64,
}

impl EscrowService {
    pub fn new(
        db_client: Arc<DBClient>,
        trust_service: Arc<TrustService>,
        platform_fee_percent: i64,
    ) -> Self {
        Self {
            db_client,
            trust_service,
            platform_fee_percent,
        }
    }

    /// Runs under a row lock on the job so concurrent actions on the same
    /// escrow serialize; the loser sees the new status and is rejected.
    pub async fn apply(
        &self,
        job_id: Uuid,
        action: EscrowAction,
        actor: &User,
    ) -> Result<EscrowOutcome, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let job = self
            .db_client
            .lock_job(&mut tx, job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let engaged = self
            .db_client
            .get_engaged_application_tx(&mut tx, job_id)
            .await?;

        let plan = plan_escrow_action(
            action,
            &job,
            actor,
            engaged.map(|a| a.worker_id),
            self.platform_fee_percent,
        )?;

        let transaction = self
            .db_client
            .create_escrow_transaction(
                &mut tx,
                job.id,
                job.employer_id,
                plan.worker_id,
                plan.amount,
                plan.platform_fee,
                action.kind(),
            )
            .await?;

        let job = self
            .db_client
            .set_job_escrow_status(&mut tx, job.id, job.escrow_status, plan.next_status)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict("Escrow was changed by another request".to_string())
            })?;

        tx.commit().await?;

        tracing::info!(
            "Escrow {:?} on job {} by {}: {} (fee {})",
            action,
            job.id,
            actor.id,
            format_paise_as_rupees(plan.amount),
            format_paise_as_rupees(plan.platform_fee)
        );

        // Released payments count toward both parties' trust.
        if let Some(worker_id) = plan.worker_id {
            for user_id in [worker_id, job.employer_id] {
                if let Err(e) = self.trust_service.recompute(user_id).await {
                    tracing::error!("Failed to recompute trust for {}: {}", user_id, e);
                }
            }
        }

        Ok(EscrowOutcome { job, transaction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usermodel::sample_user;
    use chrono::Utc;

    fn job_owned_by(employer_id: Uuid) -> Job {
        Job {
            id: Uuid::new_v4(),
            employer_id,
            title: "Paint two rooms".to_string(),
            description: "Interior painting".to_string(),
            category: "painting".to_string(),
            skills: vec!["painting".to_string()],
            pay_amount: 500_000,
            pay_type: PayType::Fixed,
            city: "Indore".to_string(),
            pincode: None,
            latitude: None,
            longitude: None,
            escrow_required: true,
            escrow_amount: 500_000,
            escrow_status: EscrowStatus::None,
            status: JobStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_escrow_transitions() {
        assert_eq!(
            next_escrow_status(EscrowStatus::None, EscrowAction::Hold).unwrap(),
            EscrowStatus::Held
        );
        assert_eq!(
            next_escrow_status(EscrowStatus::Held, EscrowAction::Release).unwrap(),
            EscrowStatus::Released
        );
        assert_eq!(
            next_escrow_status(EscrowStatus::Held, EscrowAction::Refund).unwrap(),
            EscrowStatus::Refunded
        );
        assert!(next_escrow_status(EscrowStatus::None, EscrowAction::Release).is_err());
        assert!(next_escrow_status(EscrowStatus::Held, EscrowAction::Hold).is_err());
        assert!(next_escrow_status(EscrowStatus::Released, EscrowAction::Refund).is_err());
    }

    #[test]
    fn test_only_owner_can_hold() {
        let employer = sample_user(UserRole::Employer);
        let admin = sample_user(UserRole::Admin);
        let job = job_owned_by(employer.id);

        assert!(authorize_escrow_action(EscrowAction::Hold, &job, &employer, false).is_ok());
        assert!(authorize_escrow_action(EscrowAction::Hold, &job, &admin, false).is_err());
    }

    #[test]
    fn test_release_by_owner_or_admin() {
        let employer = sample_user(UserRole::Employer);
        let admin = sample_user(UserRole::Admin);
        let stranger = sample_user(UserRole::Employer);
        let job = job_owned_by(employer.id);

        assert!(authorize_escrow_action(EscrowAction::Release, &job, &employer, true).is_ok());
        assert!(authorize_escrow_action(EscrowAction::Release, &job, &admin, true).is_ok());
        assert!(authorize_escrow_action(EscrowAction::Release, &job, &stranger, true).is_err());
    }

    #[test]
    fn test_owner_refund_only_before_acceptance() {
        let employer = sample_user(UserRole::Employer);
        let admin = sample_user(UserRole::Admin);
        let job = job_owned_by(employer.id);

        assert!(authorize_escrow_action(EscrowAction::Refund, &job, &employer, false).is_ok());
        let err = authorize_escrow_action(EscrowAction::Refund, &job, &employer, true).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(authorize_escrow_action(EscrowAction::Refund, &job, &admin, true).is_ok());
    }

    #[test]
    fn test_release_pays_worker_minus_fee() {
        let employer = sample_user(UserRole::Employer);
        let worker_id = Uuid::new_v4();
        let mut job = job_owned_by(employer.id);
        job.escrow_status = EscrowStatus::Held;

        let plan = plan_escrow_action(EscrowAction::Release, &job, &employer, Some(worker_id), 5)
            .unwrap();
        assert_eq!(
            plan,
            EscrowPlan {
                next_status: EscrowStatus::Released,
                worker_id: Some(worker_id),
                amount: 475_000,
                platform_fee: 25_000,
            }
        );
    }

    #[test]
    fn test_second_release_rejected_once_status_moved() {
        // The later of two concurrent releases reads the row after the first commits.
        let employer = sample_user(UserRole::Employer);
        let mut job = job_owned_by(employer.id);
        job.escrow_status = EscrowStatus::Released;

        let err = plan_escrow_action(EscrowAction::Release, &job, &employer, Some(Uuid::new_v4()), 5)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidEscrowTransition(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_release_needs_engaged_worker() {
        let employer = sample_user(UserRole::Employer);
        let mut job = job_owned_by(employer.id);
        job.escrow_status = EscrowStatus::Held;

        assert!(matches!(
            plan_escrow_action(EscrowAction::Release, &job, &employer, None, 5),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_hold_requires_escrow_job() {
        let employer = sample_user(UserRole::Employer);
        let mut job = job_owned_by(employer.id);

        let plan = plan_escrow_action(EscrowAction::Hold, &job, &employer, None, 5).unwrap();
        assert_eq!(plan.next_status, EscrowStatus::Held);
        assert_eq!(plan.amount, 500_000);
        assert_eq!(plan.platform_fee, 0);

        job.escrow_required = false;
        assert!(plan_escrow_action(EscrowAction::Hold, &job, &employer, None, 5).is_err());
    }
}
