use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::common::AgentId;

/// Agent account status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "agent_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// Agent - field agent account, the only role currently backed by storage
///
/// Email and phone are each unique. Agents are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub is_verified: bool,
    pub last_signed_in: Option<DateTime<Utc>>,
    pub status: AgentStatus,
    pub metadata: Json<HashMap<String, String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied at registration; everything else takes column defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub metadata: HashMap<String, String>,
}

impl Agent {
    /// Build an in-memory agent with defaults (used by store fakes).
    pub fn from_new(new: NewAgent, now: DateTime<Utc>) -> Self {
        Self {
            id: AgentId::new(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            is_verified: false,
            last_signed_in: None,
            status: AgentStatus::Active,
            metadata: Json(new.metadata),
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn find_by_id(id: AgentId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM agents WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_phone(phone: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM agents WHERE phone = $1")
            .bind(phone)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find the first agent matching either contact field. `None` never matches.
    pub async fn find_by_phone_or_email(
        phone: Option<&str>,
        email: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM agents
             WHERE ($1::text IS NOT NULL AND phone = $1)
                OR ($2::text IS NOT NULL AND email = $2)
             ORDER BY created_at
             LIMIT 1",
        )
        .bind(phone)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(new: &NewAgent, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO agents (id, name, email, phone, metadata)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(AgentId::new())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(Json(&new.metadata))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn record_sign_in(id: AgentId, at: DateTime<Utc>, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE agents SET last_signed_in = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_without_secrets() {
        let agent = Agent::from_new(
            NewAgent {
                name: "jagdish".to_string(),
                email: "omk54r@gmail.com".to_string(),
                phone: "9511791441".to_string(),
                metadata: HashMap::new(),
            },
            Utc::now(),
        );

        let json = serde_json::to_value(&agent).unwrap();
        assert_eq!(json["name"], "jagdish");
        assert_eq!(json["isVerified"], false);
        assert_eq!(json["status"], "active");
        assert!(json["lastSignedIn"].is_null());
        assert!(json["createdAt"].is_string());
        assert_eq!(json["metadata"], serde_json::json!({}));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::Suspended).unwrap(),
            "\"suspended\""
        );
        assert_eq!(AgentStatus::default(), AgentStatus::Active);
    }
}
