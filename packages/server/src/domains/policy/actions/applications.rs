//! Policy lookup and application submission.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::common::{AppError, FieldError, PolicyId};
use crate::domains::policy::models::{
    parse_date, FieldResponse, FieldValue, NewPolicyApplication, Policy, PolicyApplication,
    PolicyField, PolicyFieldType,
};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationInput {
    #[serde(default)]
    pub field_responses: Vec<FieldResponse>,
}

fn policy_not_found() -> AppError {
    AppError::NotFound("Policy does not exist".to_string())
}

/// Fetch a policy by its id string. Malformed ids are treated as unknown.
pub async fn get_policy(id: &str, deps: &ServerDeps) -> Result<Policy, AppError> {
    let id = PolicyId::parse(id.trim()).map_err(|_| policy_not_found())?;
    deps.policies
        .find_by_id(id)
        .await?
        .ok_or_else(policy_not_found)
}

/// Check one answer against its field definition.
fn check_value(field: &PolicyField, value: &FieldValue) -> Result<(), String> {
    let key = &field.key;
    let options = field.options.as_deref().unwrap_or_default();

    match (field.field_type, value) {
        (PolicyFieldType::Text | PolicyFieldType::Document, FieldValue::Text(_)) => Ok(()),
        (PolicyFieldType::Text | PolicyFieldType::Document, other) => Err(format!(
            "Field '{}' must be a string, got {}",
            key,
            other.kind()
        )),
        (PolicyFieldType::Boolean, FieldValue::Bool(_)) => Ok(()),
        (PolicyFieldType::Boolean, other) => Err(format!(
            "Field '{}' must be a boolean, got {}",
            key,
            other.kind()
        )),
        (PolicyFieldType::Number, FieldValue::Number(n)) => match (field.min, field.max) {
            (Some(min), _) if *n < min => Err(format!("Field '{}' must be at least {}", key, min)),
            (_, Some(max)) if *n > max => Err(format!("Field '{}' must be at most {}", key, max)),
            _ => Ok(()),
        },
        (PolicyFieldType::Number, other) => Err(format!(
            "Field '{}' must be a number, got {}",
            key,
            other.kind()
        )),
        (PolicyFieldType::Date, FieldValue::Text(raw)) if parse_date(raw).is_some() => Ok(()),
        (PolicyFieldType::Date, _) => Err(format!("Field '{}' must be a date", key)),
        (PolicyFieldType::Select, FieldValue::Text(choice)) if options.contains(choice) => Ok(()),
        (PolicyFieldType::Multiselect, FieldValue::List(choices))
            if choices.iter().all(|c| options.contains(c)) =>
        {
            Ok(())
        }
        (PolicyFieldType::Select | PolicyFieldType::Multiselect, _) => Err(format!(
            "Field '{}' must be chosen from: {}",
            key,
            options.join(", ")
        )),
    }
}

/// Validate answers against the policy's requirements.
pub fn validate_responses(policy: &Policy, responses: &[FieldResponse]) -> Result<(), AppError> {
    let mut errors = Vec::new();
    let mut answered = HashSet::new();

    for (index, response) in responses.iter().enumerate() {
        let path = format!("fieldResponses[{}]", index);
        let Some(field) = policy.field(&response.key) else {
            errors.push(FieldError::new(
                format!("{}.key", path),
                format!("Unknown field '{}'", response.key),
            ));
            continue;
        };
        if !answered.insert(response.key.as_str()) {
            errors.push(FieldError::new(
                format!("{}.key", path),
                format!("Field '{}' is answered more than once", response.key),
            ));
            continue;
        }
        if let Err(msg) = check_value(field, &response.value) {
            errors.push(FieldError::new(format!("{}.value", path), msg));
        }
    }

    for field in policy.requirements.iter().filter(|f| f.required) {
        if !answered.contains(field.key.as_str()) {
            errors.push(FieldError::new(
                "fieldResponses",
                format!("Field '{}' is required", field.key),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

/// Record an application against an existing policy.
pub async fn submit_application(
    policy_id: &str,
    input: SubmitApplicationInput,
    user_id: Option<Uuid>,
    deps: &ServerDeps,
) -> Result<PolicyApplication, AppError> {
    let policy = get_policy(policy_id, deps).await?;
    validate_responses(&policy, &input.field_responses)?;

    let application = deps
        .policies
        .insert_application(NewPolicyApplication {
            policy_id: policy.id,
            user_id,
            field_responses: input.field_responses,
        })
        .await?;

    info!(policy_id = %policy.id, application_id = %application.id, "Policy application submitted");
    Ok(application)
}
