//! Create policy action with field-schema validation.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::common::{AppError, FieldError};
use crate::domains::policy::models::{
    parse_date, NewPolicy, Policy, PolicyField, PolicyFieldType, ValidityPeriod,
};
use crate::kernel::ServerDeps;

/// A requirement as submitted, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub example_url: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Kept loose so a non-boolean can be reported instead of rejected outright.
    #[serde(default)]
    pub required: Option<serde_json::Value>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Validity window as submitted; dates are parsed during validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidityPeriodInput {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<Vec<RequirementInput>>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub validity_period: Option<ValidityPeriodInput>,
    #[serde(default)]
    pub rules: Option<Vec<String>>,
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A present date must parse; a bad one is reported under `path`.
fn optional_date(
    raw: Option<&str>,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.push(FieldError::new(
            path,
            format!("'{}' is not a valid date (use YYYY-MM-DD or RFC 3339)", raw),
        ));
    }
    parsed
}

fn validate_requirement(
    index: usize,
    input: &RequirementInput,
    seen_keys: &mut HashSet<String>,
    errors: &mut Vec<FieldError>,
) -> Option<PolicyField> {
    let path = |field: &str| format!("requirements[{}].{}", index, field);
    let before = errors.len();

    let key = filled(&input.key);
    match &key {
        None => errors.push(FieldError::new(path("key"), "Requirement key is required")),
        Some(key) if !seen_keys.insert(key.clone()) => errors.push(FieldError::new(
            path("key"),
            format!("Requirement key '{}' is used more than once", key),
        )),
        _ => {}
    }

    let name = filled(&input.name);
    if name.is_none() {
        errors.push(FieldError::new(path("name"), "Requirement name is required"));
    }

    let field_type = input.field_type.as_deref().and_then(PolicyFieldType::parse);
    if field_type.is_none() {
        errors.push(FieldError::new(path("type"), "Invalid requirement type"));
    }

    let required = match &input.required {
        Some(serde_json::Value::Bool(required)) => Some(*required),
        _ => {
            errors.push(FieldError::new(
                path("required"),
                "Requirement required field must be a boolean",
            ));
            None
        }
    };

    let example_url = filled(&input.example_url);
    if field_type == Some(PolicyFieldType::Document) && example_url.is_none() {
        errors.push(FieldError::new(
            path("exampleUrl"),
            "exampleUrl is required when type is 'document'.",
        ));
    }

    let options = input.options.clone().filter(|o| !o.is_empty());
    if field_type.map(|t| t.needs_options()).unwrap_or(false) && options.is_none() {
        errors.push(FieldError::new(
            path("options"),
            "options must be provided when type is 'select' or 'multiselect'.",
        ));
    }

    if let (Some(min), Some(max)) = (input.min, input.max) {
        if min > max {
            errors.push(FieldError::new(path("min"), "Requirement min must not exceed max"));
        }
    }

    if errors.len() > before {
        return None;
    }

    Some(PolicyField {
        key: key?,
        name: name?,
        field_type: field_type?,
        description: filled(&input.description),
        example_url,
        options,
        required: required?,
        file_type: filled(&input.file_type),
        min: input.min,
        max: input.max,
    })
}

/// Check every rule and return all failures at once.
pub fn validate_policy(input: &CreatePolicyInput, created_by: Uuid) -> Result<NewPolicy, AppError> {
    let mut errors = Vec::new();

    let title = filled(&input.title);
    if title.is_none() {
        errors.push(FieldError::new("title", "Title is required"));
    }
    let description = filled(&input.description);
    if description.is_none() {
        errors.push(FieldError::new("description", "Description is required"));
    }

    let mut requirements = Vec::new();
    match input.requirements.as_deref() {
        None | Some([]) => errors.push(FieldError::new(
            "requirements",
            "At least one requirement is required",
        )),
        Some(inputs) => {
            let mut seen_keys = HashSet::new();
            for (index, requirement) in inputs.iter().enumerate() {
                if let Some(field) =
                    validate_requirement(index, requirement, &mut seen_keys, &mut errors)
                {
                    requirements.push(field);
                }
            }
        }
    }

    let target_audience = filled(&input.target_audience);
    if target_audience.is_none() {
        errors.push(FieldError::new("targetAudience", "Target audience is required"));
    }

    let expiry_date = optional_date(input.expiry_date.as_deref(), "expiryDate", &mut errors);

    let validity_period = input.validity_period.as_ref().map(|period| ValidityPeriod {
        start: optional_date(period.start.as_deref(), "validityPeriod.start", &mut errors),
        end: optional_date(period.end.as_deref(), "validityPeriod.end", &mut errors),
    });
    if let Some(ValidityPeriod {
        start: Some(start),
        end: Some(end),
    }) = &validity_period
    {
        if start > end {
            errors.push(FieldError::new(
                "validityPeriod",
                "Validity period start must not be after end",
            ));
        }
    }

    match (title, description, target_audience) {
        (Some(title), Some(description), Some(target_audience)) if errors.is_empty() => {
            Ok(NewPolicy {
                title,
                description,
                requirements,
                target_audience,
                expiry_date,
                validity_period,
                rules: input.rules.clone(),
                created_by,
            })
        }
        _ => Err(AppError::validation(errors)),
    }
}

/// Validate and store a policy owned by `created_by`.
pub async fn create_policy(
    input: CreatePolicyInput,
    created_by: Uuid,
    deps: &ServerDeps,
) -> Result<Policy, AppError> {
    let new_policy = validate_policy(&input, created_by)?;
    let policy = deps.policies.insert(new_policy).await?;

    info!(policy_id = %policy.id, created_by = %created_by, "Policy created");
    Ok(policy)
}
