//! Send OTP action

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use tracing::{info, warn};

use crate::common::AppError;
use crate::config::Config;
use crate::domains::otp::models::{OtpIssue, OTP_TTL_MINUTES};
use crate::kernel::ServerDeps;

const OTP_LENGTH: usize = 6;

/// Six random digits, or the configured fixed code in development.
pub fn generate_code(config: &Config) -> String {
    if config.development {
        if let Some(code) = &config.otp_fixed_code {
            return code.clone();
        }
    }

    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
        .collect()
}

/// Issue a code for `phone` and dispatch it by SMS.
///
/// Fails with `Conflict` while an unexpired code exists. SMS delivery
/// failures are logged only; the stored code stays verifiable.
pub async fn send_otp(phone: &str, deps: &ServerDeps) -> Result<String, AppError> {
    send_otp_at(phone, Utc::now(), deps).await
}

pub(crate) async fn send_otp_at(
    phone: &str,
    now: DateTime<Utc>,
    deps: &ServerDeps,
) -> Result<String, AppError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(AppError::BadRequest("Phone number is required".to_string()));
    }

    let code = generate_code(&deps.config);
    let otp = match deps.otps.issue(phone, &code, now).await? {
        OtpIssue::Issued(otp) => otp,
        OtpIssue::Active(existing) => {
            return Err(AppError::Conflict(format!(
                "You can request a new OTP after {} minutes",
                existing.remaining_minutes(now)
            )));
        }
    };

    let body = format!(
        "Your verification code is {}. It expires in {} minutes.",
        otp.code, OTP_TTL_MINUTES
    );
    if let Err(e) = deps.sms.send_sms(phone, &body).await {
        warn!(phone = %phone, error = %e, "Failed to deliver OTP");
    } else {
        info!(phone = %phone, "OTP sent");
    }

    Ok(phone.to_string())
}
