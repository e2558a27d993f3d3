use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use serde::Serialize;

use crate::common::{ApiResponse, AppError};
use crate::domains::files::upload_files;
use crate::server::app::AppState;
use crate::server::extract::read_form;

/// Multipart part name carrying files to relay.
pub const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize)]
pub struct UploadedUrls {
    pub urls: Vec<String>,
}

pub async fn upload_files_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_form(multipart).await?;
    let files = form.take_files(FILES_FIELD);
    if let Some(unexpected) = form.files.first() {
        return Err(AppError::BadRequest(format!(
            "Unexpected field '{}'",
            unexpected.field_name
        )));
    }

    let urls = upload_files(files, &state.deps).await?;
    Ok(ApiResponse::ok(UploadedUrls { urls }, "Files uploaded successfully"))
}
