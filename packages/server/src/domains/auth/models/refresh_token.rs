use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::RefreshTokenId;

/// RefreshTokenRecord - a persisted refresh token, also the unit of revocation
///
/// `user_id` is role-agnostic: it holds the id of whichever user collection
/// `role` names.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    #[serde(skip_serializing)]
    pub token: String,
    pub user_id: Uuid,
    pub role: String,
    pub device_info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(token: String, user_id: Uuid, role: &str, device_info: &str) -> Self {
        let now = Utc::now();
        Self {
            id: RefreshTokenId::new(),
            token,
            user_id,
            role: role.to_string(),
            device_info: device_info.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO refresh_tokens (id, token, user_id, role, device_info, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.token)
        .bind(self.user_id)
        .bind(&self.role)
        .bind(&self.device_info)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_token(token: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Delete every refresh token owned by the user (all devices).
    pub async fn delete_by_user(user_id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
