use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::common::AppError;
use crate::domains::auth::{authenticate, AuthUser};
use crate::server::app::AppState;
use crate::server::cookies::{cookie_value, ACCESS_TOKEN_COOKIE};

/// Parse `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token_from_header(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    parts.next().filter(|token| !token.is_empty())
}

/// Session token from the `accessToken` cookie, else the bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    cookie_value(headers, ACCESS_TOKEN_COOKIE)
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token_from_header(headers))
}

/// JWT authentication middleware
///
/// Rejects the request unless it carries a valid access token whose user
/// still exists; on success the `AuthUser` is added to request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Missing Acess Token".to_string()))?;
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let user = authenticate(&token, user_agent.as_deref(), &state.deps).await?;
    debug!(user_id = %user.id, role = %user.role, "Authenticated request");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for handlers mounted behind `jwt_auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Missing Acess Token".to_string()))
    }
}
