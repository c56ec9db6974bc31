// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::{db::userdb::UserExt, AppState};

/// Prunes expired sessions, email OTPs and idle rate-limit keys every 15 minutes.
pub async fn start_cleanup_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(900));

    loop {
        interval.tick().await;

        tracing::debug!("Running cleanup job at {}", Utc::now());

        match app_state.db_client.delete_expired_sessions().await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Removed {} expired sessions", count),
            Err(e) => tracing::error!("Session cleanup failed: {}", e),
        }

        match app_state.otp_store.purge_expired().await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Removed {} expired email OTPs", count),
            Err(e) => tracing::error!("OTP cleanup failed: {}", e),
        }

        let idle_keys = app_state.otp_limiter.prune() + app_state.login_limiter.prune();
        if idle_keys > 0 {
            tracing::debug!("Dropped {} idle rate-limit keys", idle_keys);
        }
    }
}
