use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use crate::common::PolicyId;

/// The closed set of input kinds a policy requirement can ask for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PolicyFieldType {
    Text,
    Date,
    Number,
    Document,
    Boolean,
    Select,
    Multiselect,
}

impl PolicyFieldType {
    pub const ALL: [PolicyFieldType; 7] = [
        PolicyFieldType::Text,
        PolicyFieldType::Date,
        PolicyFieldType::Number,
        PolicyFieldType::Document,
        PolicyFieldType::Boolean,
        PolicyFieldType::Select,
        PolicyFieldType::Multiselect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyFieldType::Text => "text",
            PolicyFieldType::Date => "date",
            PolicyFieldType::Number => "number",
            PolicyFieldType::Document => "document",
            PolicyFieldType::Boolean => "boolean",
            PolicyFieldType::Select => "select",
            PolicyFieldType::Multiselect => "multiselect",
        }
    }

    /// Exact, case-sensitive match against the wire names.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    pub fn needs_options(&self) -> bool {
        matches!(self, PolicyFieldType::Select | PolicyFieldType::Multiselect)
    }
}

impl fmt::Display for PolicyFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requirement of a policy, i.e. one input on the generated form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyField {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: PolicyFieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidityPeriod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Policy - a typed, self-describing form definition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub title: String,
    pub description: String,
    pub requirements: Json<Vec<PolicyField>>,
    pub target_audience: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub validity_period: Option<Json<ValidityPeriod>>,
    pub rules: Option<Vec<String>>,
    #[serde(rename = "created_by")]
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated policy ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPolicy {
    pub title: String,
    pub description: String,
    pub requirements: Vec<PolicyField>,
    pub target_audience: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub validity_period: Option<ValidityPeriod>,
    pub rules: Option<Vec<String>>,
    pub created_by: Uuid,
}

impl Policy {
    pub fn from_new(new: NewPolicy, now: DateTime<Utc>) -> Self {
        Self {
            id: PolicyId::new(),
            title: new.title,
            description: new.description,
            requirements: Json(new.requirements),
            target_audience: new.target_audience,
            expiry_date: new.expiry_date,
            validity_period: new.validity_period.map(Json),
            rules: new.rules,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, key: &str) -> Option<&PolicyField> {
        self.requirements.iter().find(|f| f.key == key)
    }

    pub async fn insert(new: &NewPolicy, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO policies (
                id, title, description, requirements, target_audience,
                expiry_date, validity_period, rules, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(PolicyId::new())
        .bind(&new.title)
        .bind(&new.description)
        .bind(Json(&new.requirements))
        .bind(&new.target_audience)
        .bind(new.expiry_date)
        .bind(new.validity_period.as_ref().map(Json))
        .bind(&new.rules)
        .bind(new.created_by)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: PolicyId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM policies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}
