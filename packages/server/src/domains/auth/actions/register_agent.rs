//! Register agent action

use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::common::validation::{is_valid_email, is_valid_mobile};
use crate::common::{AppError, FieldError};
use crate::domains::agents::models::{Agent, NewAgent};
use crate::domains::auth::actions::login::non_blank;
use crate::kernel::{ServerDeps, UploadedFile};

/// Folder that identity documents are uploaded into.
pub const AGENT_DOCUMENT_FOLDER: &str = "images";

/// Metadata key holding the uploaded Aadhaar document URL.
pub const ADHAAR_FILE_KEY: &str = "adhaar_file";

#[derive(Debug, Clone, Default)]
pub struct RegisterAgentInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub otp: Option<String>,
    pub adhaar_file: Option<UploadedFile>,
}

/// Validated registration fields.
struct AgentFields {
    name: String,
    email: String,
    phone: String,
}

fn validate(input: &RegisterAgentInput) -> Result<AgentFields, AppError> {
    let name = non_blank(input.name.clone());
    let email = non_blank(input.email.clone());
    let phone = non_blank(input.phone.clone());
    let otp = non_blank(input.otp.clone());

    let mut errors = Vec::new();
    if name.is_none() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    match &email {
        None => errors.push(FieldError::new("email", "Email is required")),
        Some(email) if !is_valid_email(email) => {
            errors.push(FieldError::new("email", "Invalid email"))
        }
        _ => {}
    }
    match &phone {
        None => errors.push(FieldError::new("phone", "Phone is required")),
        Some(phone) if !is_valid_mobile(phone) => {
            errors.push(FieldError::new("phone", "Invalid phone number"))
        }
        _ => {}
    }
    if otp.is_none() {
        errors.push(FieldError::new("otp", "OTP is required"));
    }

    match (name, email, phone) {
        (Some(name), Some(email), Some(phone)) if errors.is_empty() => Ok(AgentFields {
            name,
            email,
            phone,
        }),
        _ => Err(AppError::validation(errors)),
    }
}

/// Create an agent account. Rejects a phone or email that is already taken.
pub async fn register_agent(
    input: RegisterAgentInput,
    deps: &ServerDeps,
) -> Result<Agent, AppError> {
    let fields = validate(&input)?;

    let existing = deps
        .agents
        .find_by_phone_or_email(Some(&fields.phone), Some(&fields.email))
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Agent already exists".to_string()));
    }

    let mut metadata = HashMap::new();
    if let Some(file) = input.adhaar_file {
        let media = deps.media.as_ref().ok_or_else(|| {
            AppError::Configuration("Media storage is not configured".to_string())
        })?;
        let url = media
            .upload(file, AGENT_DOCUMENT_FOLDER)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to upload agent document");
                AppError::UploadFailed
            })?;
        metadata.insert(ADHAAR_FILE_KEY.to_string(), url);
    }

    let agent = match deps
        .agents
        .insert(NewAgent {
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            metadata: metadata.clone(),
        })
        .await
    {
        Ok(agent) => agent,
        Err(e) => {
            if let Some(url) = metadata.get(ADHAAR_FILE_KEY) {
                warn!(url = %url, "Agent insert failed; uploaded document is orphaned");
            }
            return Err(e.into());
        }
    };

    info!(agent_id = %agent.id, "Agent registered");
    Ok(agent)
}
