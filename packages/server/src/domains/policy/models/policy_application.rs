use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{PolicyApplicationId, PolicyId};

/// A submitted answer. Dates and ids travel as text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "string",
            FieldValue::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldResponse {
    pub key: String,
    pub value: FieldValue,
}

/// PolicyApplication - one applicant's answers to a policy's requirements
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PolicyApplication {
    pub id: PolicyApplicationId,
    pub policy_id: PolicyId,
    pub user_id: Option<Uuid>,
    pub field_responses: Json<Vec<FieldResponse>>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPolicyApplication {
    pub policy_id: PolicyId,
    pub user_id: Option<Uuid>,
    pub field_responses: Vec<FieldResponse>,
}

impl PolicyApplication {
    pub fn from_new(new: NewPolicyApplication, now: DateTime<Utc>) -> Self {
        Self {
            id: PolicyApplicationId::new(),
            policy_id: new.policy_id,
            user_id: new.user_id,
            field_responses: Json(new.field_responses),
            submitted_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(new: &NewPolicyApplication, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO policy_applications (id, policy_id, user_id, field_responses)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(PolicyApplicationId::new())
        .bind(new.policy_id)
        .bind(new.user_id)
        .bind(Json(&new.field_responses))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
