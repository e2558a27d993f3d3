use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::OtpId;

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 3;

/// Otp - one pending passcode per phone number
///
/// The `phone` column is unique, so a phone has at most one row. An expired
/// row is overwritten by the next issuance or removed by the purge task.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Otp {
    pub id: OtpId,
    pub phone: String,
    #[serde(skip_serializing)]
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of an issuance attempt.
#[derive(Debug, Clone)]
pub enum OtpIssue {
    /// A fresh code was stored.
    Issued(Otp),
    /// An unexpired code already exists for the phone; nothing was written.
    Active(Otp),
}

impl Otp {
    pub fn new(phone: &str, code: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: OtpId::new(),
            phone: phone.to_string(),
            code: code.to_string(),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whole minutes until expiry, rounded up (never below 1 while active).
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.expires_at - now).num_seconds().max(0);
        let minutes = (seconds + 59) / 60;
        if self.is_active(now) {
            minutes.max(1)
        } else {
            0
        }
    }

    /// Store a new code unless an unexpired one exists, in one statement.
    ///
    /// The conditional upsert closes the window where two concurrent
    /// requests could both observe "no active code" and both write.
    pub async fn issue(phone: &str, code: &str, now: DateTime<Utc>, pool: &PgPool) -> Result<OtpIssue> {
        let candidate = Self::new(phone, code, now);
        let stored = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO otps (id, phone, code, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (phone) DO UPDATE
                SET code = EXCLUDED.code,
                    expires_at = EXCLUDED.expires_at,
                    created_at = EXCLUDED.created_at,
                    updated_at = EXCLUDED.updated_at
                WHERE otps.expires_at <= $5
            RETURNING *
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.phone)
        .bind(&candidate.code)
        .bind(candidate.expires_at)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        if let Some(otp) = stored {
            return Ok(OtpIssue::Issued(otp));
        }

        match Self::find_active(phone, now, pool).await? {
            Some(active) => Ok(OtpIssue::Active(active)),
            // Consumed or purged between the two statements.
            None => {
                let otp = sqlx::query_as::<_, Self>(
                    r#"
                    INSERT INTO otps (id, phone, code, expires_at, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $5)
                    ON CONFLICT (phone) DO UPDATE
                        SET code = EXCLUDED.code,
                            expires_at = EXCLUDED.expires_at,
                            updated_at = EXCLUDED.updated_at
                    RETURNING *
                    "#,
                )
                .bind(candidate.id)
                .bind(&candidate.phone)
                .bind(&candidate.code)
                .bind(candidate.expires_at)
                .bind(now)
                .fetch_one(pool)
                .await?;
                Ok(OtpIssue::Issued(otp))
            }
        }
    }

    async fn find_active(phone: &str, now: DateTime<Utc>, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM otps WHERE phone = $1 AND expires_at > $2")
            .bind(phone)
            .bind(now)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Delete the matching unexpired code and return it. At most one caller
    /// can consume a given row.
    pub async fn consume(
        phone: &str,
        code: &str,
        now: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "DELETE FROM otps WHERE phone = $1 AND code = $2 AND expires_at > $3 RETURNING *",
        )
        .bind(phone)
        .bind(code)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Remove expired rows. Returns the number deleted.
    pub async fn purge_expired(now: DateTime<Utc>, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM otps WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
