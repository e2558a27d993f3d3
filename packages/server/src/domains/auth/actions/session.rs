//! Session actions: verify an access token, refresh it, revoke it.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::auth::jwt::{Claims, TokenPayload};
use crate::domains::auth::role::{Role, UserAccount};
use crate::kernel::ServerDeps;

/// The verified caller, attached to the request by the session middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub device_info: String,
    pub user: UserAccount,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

fn invalid_token() -> AppError {
    AppError::Unauthorized("Invalid Token".to_string())
}

/// Load the user a verified token names. Unresolvable roles fail closed.
async fn load_user(claims: &Claims, deps: &ServerDeps) -> Result<(Role, UserAccount), AppError> {
    let (role, users) = deps.users.resolve(&claims.role).map_err(|e| {
        debug!(role = %claims.role, error = %e, "Token carries an unusable role");
        invalid_token()
    })?;

    let user = users
        .find_by_id(claims.id)
        .await?
        .ok_or_else(invalid_token)?;

    Ok((role, user))
}

/// Verify an access token and resolve its user.
///
/// With device matching enabled, the caller's user-agent must equal the one
/// the token was issued to.
pub async fn authenticate(
    token: &str,
    user_agent: Option<&str>,
    deps: &ServerDeps,
) -> Result<AuthUser, AppError> {
    let claims = deps
        .jwt_service
        .verify_access_token(token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    if deps.config.enforce_device_match && user_agent.unwrap_or_default() != claims.device_info {
        return Err(AppError::Unauthorized("Unauthorized Request".to_string()));
    }

    let (role, user) = load_user(&claims, deps).await?;

    Ok(AuthUser {
        id: claims.id,
        role,
        device_info: claims.device_info,
        user,
    })
}

/// Revoke every refresh token of the user (all devices).
pub async fn logout(user: &AuthUser, deps: &ServerDeps) -> Result<(), AppError> {
    let revoked = deps.jwt_service.revoke(user.id).await?;
    info!(user_id = %user.id, revoked, "User logged out");
    Ok(())
}

/// Exchange a live, unrevoked refresh token for a new access token.
pub async fn refresh_access_token(
    refresh_token: Option<&str>,
    deps: &ServerDeps,
) -> Result<RefreshResponse, AppError> {
    let token = refresh_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing Refresh Token".to_string()))?;

    let claims = deps
        .jwt_service
        .verify_refresh_token(token)
        .await
        .map_err(|e| match e {
            AppError::InvalidToken => invalid_token(),
            other => other,
        })?;

    let (role, user) = load_user(&claims, deps).await?;

    let access_token = deps.jwt_service.issue_access_token(&TokenPayload {
        id: user.id(),
        role,
        device_info: claims.device_info,
    })?;

    Ok(RefreshResponse { access_token })
}
