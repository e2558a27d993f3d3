//! Verify OTP action

use chrono::{DateTime, Utc};

use crate::common::AppError;
use crate::kernel::ServerDeps;

/// Check `code` against the unexpired OTP for `phone` and consume it.
///
/// A code verifies at most once; any mismatch, expiry or reuse is
/// `InvalidOrExpiredOtp`.
pub async fn verify_otp(phone: &str, code: &str, deps: &ServerDeps) -> Result<(), AppError> {
    verify_otp_at(phone, code, Utc::now(), deps).await
}

pub(crate) async fn verify_otp_at(
    phone: &str,
    code: &str,
    now: DateTime<Utc>,
    deps: &ServerDeps,
) -> Result<(), AppError> {
    match deps.otps.consume(phone.trim(), code, now).await? {
        Some(_) => Ok(()),
        None => Err(AppError::InvalidOrExpiredOtp),
    }
}
