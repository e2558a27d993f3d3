use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE, USER_AGENT};
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse};
use serde::{Deserialize, Serialize};

use crate::common::{ApiResponse, AppError, Empty};
use crate::domains::auth::{
    login_agent, login_user, logout, refresh_access_token, register_agent, LoginInput,
    LoginResponse, RegisterAgentInput, ADHAAR_FILE_KEY,
};
use crate::domains::otp::send_otp;
use crate::server::app::AppState;
use crate::server::cookies::{
    clear_cookie, cookie_value, session_cookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::server::extract::{read_form, AppJson};
use crate::server::middleware::CurrentUser;

/// Header naming the collection a login targets.
pub const ROLE_HEADER: &str = "role";

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendOtpData {
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn secure_cookies(state: &AppState) -> bool {
    !state.deps.config.development
}

fn with_session_cookies(
    state: &AppState,
    data: LoginResponse,
) -> impl IntoResponse {
    let secure = secure_cookies(state);
    let cookies = AppendHeaders([
        (
            SET_COOKIE,
            session_cookie(REFRESH_TOKEN_COOKIE, &data.refresh_token, secure),
        ),
        (
            SET_COOKIE,
            session_cookie(ACCESS_TOKEN_COOKIE, &data.access_token, secure),
        ),
    ]);
    (cookies, ApiResponse::ok(data, "User logged in successfully"))
}

pub async fn send_otp_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<SendOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let phone = send_otp(body.phone.as_deref().unwrap_or_default(), &state.deps).await?;
    Ok(ApiResponse::ok(SendOtpData { phone }, "OTP sent successfully"))
}

pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(body): AppJson<LoginInput>,
) -> Result<impl IntoResponse, AppError> {
    let role = headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok());
    let data = login_user(role, body, &user_agent(&headers), &state.deps).await?;
    Ok(with_session_cookies(&state, data))
}

pub async fn login_agent_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(body): AppJson<LoginInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = login_agent(body, &user_agent(&headers), &state.deps).await?;
    Ok(with_session_cookies(&state, data))
}

/// Accepts `multipart/form-data` (optionally with an `adhaar_file` part) or JSON.
pub async fn register_agent_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let input = if is_multipart {
        let multipart = Multipart::from_request(request, &state).await?;
        let mut form = read_form(multipart).await?;
        RegisterAgentInput {
            name: form.field("name"),
            email: form.field("email"),
            phone: form.field("phone"),
            otp: form.field("otp"),
            adhaar_file: form.take_files(ADHAAR_FILE_KEY).into_iter().next(),
        }
    } else {
        let AppJson(body) = AppJson::<RegisterAgentRequest>::from_request(request, &state).await?;
        RegisterAgentInput {
            name: body.name,
            email: body.email,
            phone: body.phone,
            otp: body.otp,
            adhaar_file: None,
        }
    };

    register_agent(input, &state.deps).await?;
    Ok(ApiResponse::created(Empty {}, "Agent registered"))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    logout(&user, &state.deps).await?;

    let secure = secure_cookies(&state);
    let cookies = AppendHeaders([
        (SET_COOKIE, clear_cookie(ACCESS_TOKEN_COOKIE, secure)),
        (SET_COOKIE, clear_cookie(REFRESH_TOKEN_COOKIE, secure)),
    ]);
    Ok((cookies, ApiResponse::ok(Empty {}, "User logged out successfully")))
}

pub async fn me_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    ApiResponse::ok(user.user, "User fetched successfully")
}

/// Refresh token from the cookie, else from a `{refreshToken}` JSON body.
pub async fn refresh_token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let from_body = serde_json::from_slice::<RefreshTokenRequest>(&body)
        .ok()
        .and_then(|b| b.refresh_token);
    let token = cookie_value(&headers, REFRESH_TOKEN_COOKIE)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or(from_body);

    let data = refresh_access_token(token.as_deref(), &state.deps).await?;

    let cookie = session_cookie(ACCESS_TOKEN_COOKIE, &data.access_token, secure_cookies(&state));
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        ApiResponse::ok(data, "Access token refreshed successfully"),
    ))
}
