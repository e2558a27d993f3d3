use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::common::{ApiResponse, AppError};
use crate::domains::policy::{
    create_policy, get_policy, submit_application, CreatePolicyInput, SubmitApplicationInput,
};
use crate::server::app::AppState;
use crate::server::extract::AppJson;
use crate::server::middleware::CurrentUser;

pub async fn create_policy_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreatePolicyInput>,
) -> Result<impl IntoResponse, AppError> {
    let policy = create_policy(body, user.id, &state.deps).await?;
    Ok(ApiResponse::created(policy, "Policy created successfully"))
}

pub async fn get_policy_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let policy = get_policy(&id, &state.deps).await?;
    Ok(ApiResponse::ok(policy, "Policy fetched successfully"))
}

pub async fn submit_application_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<SubmitApplicationInput>,
) -> Result<impl IntoResponse, AppError> {
    let application = submit_application(&id, body, Some(user.id), &state.deps).await?;
    Ok(ApiResponse::created(
        application,
        "Application submitted successfully",
    ))
}
