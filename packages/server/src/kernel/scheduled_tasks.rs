//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Expired OTP rows are swept every minute. Issuance already overwrites an
//! expired row for the same phone, so the sweep only bounds table growth.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::kernel::BaseOtpStore;

/// Every minute, on the minute.
const OTP_PURGE_SCHEDULE: &str = "0 * * * * *";

/// Start all scheduled tasks
pub async fn start_scheduler(otps: Arc<dyn BaseOtpStore>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let purge_job = Job::new_async(OTP_PURGE_SCHEDULE, move |_uuid, _lock| {
        let otps = otps.clone();
        Box::pin(async move {
            if let Err(e) = run_otp_purge(otps.as_ref()).await {
                tracing::error!("OTP purge task failed: {}", e);
            }
        })
    })?;

    scheduler.add(purge_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (expired OTP purge every minute)");
    Ok(scheduler)
}

/// Delete expired OTPs once. Returns how many were removed.
pub async fn run_otp_purge(otps: &dyn BaseOtpStore) -> Result<u64> {
    let purged = otps.purge_expired(Utc::now()).await?;
    if purged > 0 {
        tracing::debug!(purged, "Purged expired OTPs");
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::otp::models::Otp;
    use crate::kernel::test_dependencies::InMemoryOtpStore;

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let store = InMemoryOtpStore::new();
        store.insert_raw(Otp::new("7038823053", "111111", Utc::now() - chrono::Duration::minutes(10)));
        store.insert_raw(Otp::new("9511791441", "222222", Utc::now()));

        let purged = tokio_test::assert_ok!(run_otp_purge(&store).await);
        assert_eq!(purged, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(run_otp_purge(&store).await.unwrap(), 0);
    }
}
