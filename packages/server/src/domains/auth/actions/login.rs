//! Login actions: OTP-gated token issuance for any role, or agents only.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::AppError;
use crate::domains::auth::jwt::TokenPayload;
use crate::domains::auth::role::{Role, UserAccount, UserCollection};
use crate::domains::otp::verify_otp;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

/// Tokens plus the signed-in user. `role` is omitted on the agent-only login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Login for the role named in the `Role` header.
pub async fn login_user(
    role: Option<&str>,
    input: LoginInput,
    device_info: &str,
    deps: &ServerDeps,
) -> Result<LoginResponse, AppError> {
    let role = role
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest("Role is required".to_string()))?;

    let phone = non_blank(input.phone);
    let email = non_blank(input.email);
    if phone.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "Phone or email is required".to_string(),
        ));
    }

    // Codes are bound to phones, so an email-only login cannot pass.
    let otp = input.otp.unwrap_or_default();
    match phone.as_deref() {
        Some(phone) => verify_otp(phone, &otp, deps).await?,
        None => return Err(AppError::InvalidOrExpiredOtp),
    }

    let (role, users) = deps.users.resolve(role)?;
    // The account must own the phone the code was verified against.
    let user = users
        .find_by_phone_or_email(phone.as_deref(), email.as_deref())
        .await?
        .filter(|user| Some(user.phone()) == phone.as_deref())
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    let (access_token, refresh_token) = start_session(&user, role, device_info, &users, deps).await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        user,
        role: Some(role),
    })
}

/// Login fixed to the agent role; lookup by phone only.
pub async fn login_agent(
    input: LoginInput,
    device_info: &str,
    deps: &ServerDeps,
) -> Result<LoginResponse, AppError> {
    let phone = non_blank(input.phone).ok_or_else(|| {
        AppError::BadRequest("Phone or email is required".to_string())
    })?;

    verify_otp(&phone, &input.otp.unwrap_or_default(), deps).await?;

    let agent = deps
        .agents
        .find_by_phone(&phone)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;
    let user = UserAccount::Agent(agent);

    let users = deps.users.collection(Role::Agent)?;
    let (access_token, refresh_token) =
        start_session(&user, Role::Agent, device_info, &users, deps).await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        user,
        role: None,
    })
}

/// Issue the token pair and stamp the sign-in time.
async fn start_session(
    user: &UserAccount,
    role: Role,
    device_info: &str,
    users: &UserCollection<'_>,
    deps: &ServerDeps,
) -> Result<(String, String), AppError> {
    let payload = TokenPayload {
        id: user.id(),
        role,
        device_info: device_info.to_string(),
    };

    let access_token = deps.jwt_service.issue_access_token(&payload)?;
    let refresh_token = deps.jwt_service.issue_refresh_token(&payload).await?;

    if let Err(e) = users.record_sign_in(user, Utc::now()).await {
        warn!(user_id = %payload.id, error = %e, "Failed to record sign-in time");
    }
    info!(user_id = %payload.id, role = %role, "User logged in");

    Ok((access_token, refresh_token))
}
