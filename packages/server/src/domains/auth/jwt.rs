use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::common::AppError;
use crate::config::{Config, TokenSettings};
use crate::domains::auth::models::RefreshTokenRecord;
use crate::domains::auth::role::Role;
use crate::kernel::BaseRefreshTokenStore;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: Uuid,       // User id within the role's collection
    pub role: String,   // Role name as issued; re-resolved on every request
    #[serde(rename = "deviceInfo")]
    pub device_info: String, // User-agent of the client the token was issued to
    pub iat: i64,
    pub exp: i64,
    pub jti: String, // Unique token id, keeps same-second tokens distinct
}

/// What gets embedded in both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub id: Uuid,
    pub role: Role,
    pub device_info: String,
}

/// Sign `payload` with the given secret and lifetime.
pub fn sign_token(payload: &TokenPayload, settings: &TokenSettings) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        id: payload.id,
        role: payload.role.as_str().to_string(),
        device_info: payload.device_info.clone(),
        iat: now.timestamp(),
        exp: (now + settings.expiry).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| AppError::TokenGeneration(format!("Failed to sign token: {}", e)))
}

/// Verify signature and expiry. Every failure is `InvalidToken`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

/// JWT Service - issues, verifies and revokes session tokens
#[derive(Clone)]
pub struct JwtService {
    access: TokenSettings,
    refresh: Option<TokenSettings>,
    refresh_tokens: Arc<dyn BaseRefreshTokenStore>,
}

impl JwtService {
    pub fn new(config: &Config, refresh_tokens: Arc<dyn BaseRefreshTokenStore>) -> Self {
        Self {
            access: config.access_token.clone(),
            refresh: config.refresh_token(),
            refresh_tokens,
        }
    }

    pub fn issue_access_token(&self, payload: &TokenPayload) -> Result<String, AppError> {
        sign_token(payload, &self.access)
    }

    /// Sign a refresh token and persist its record.
    pub async fn issue_refresh_token(&self, payload: &TokenPayload) -> Result<String, AppError> {
        let settings = self.refresh.as_ref().ok_or_else(|| {
            AppError::Configuration("Refresh token secret or expiry time not defined".to_string())
        })?;

        let token = sign_token(payload, settings)?;
        let record = RefreshTokenRecord::new(
            token.clone(),
            payload.id,
            payload.role.as_str(),
            &payload.device_info,
        );
        self.refresh_tokens.insert(record).await.map_err(|e| {
            error!(user_id = %payload.id, error = %e, "Failed to persist refresh token");
            AppError::TokenGeneration(
                "Something went wrong while generating the refresh token".to_string(),
            )
        })?;

        Ok(token)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        verify_token(token, &self.access.secret)
    }

    /// Verify a refresh token and require that its record has not been revoked.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        let settings = self.refresh.as_ref().ok_or_else(|| {
            AppError::Configuration("Refresh token secret or expiry time not defined".to_string())
        })?;
        let claims = verify_token(token, &settings.secret)?;

        match self.refresh_tokens.find_by_token(token).await? {
            Some(record) if record.user_id == claims.id => Ok(claims),
            _ => Err(AppError::InvalidToken),
        }
    }

    /// Delete every refresh token record of the user (all devices).
    pub async fn revoke(&self, user_id: Uuid) -> Result<u64, AppError> {
        Ok(self.refresh_tokens.delete_by_user(user_id).await?)
    }
}
