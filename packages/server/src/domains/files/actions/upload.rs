use futures::future::try_join_all;
use tracing::{error, info};

use crate::common::AppError;
use crate::kernel::{ServerDeps, UploadedFile};

/// Largest single file accepted for relay.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Media-store folder for general uploads.
pub const UPLOAD_FOLDER: &str = "files";

/// Relay files to the media store; URLs come back in input order.
pub async fn upload_files(
    files: Vec<UploadedFile>,
    deps: &ServerDeps,
) -> Result<Vec<String>, AppError> {
    if let Some(file) = files.iter().find(|f| f.bytes.len() > MAX_FILE_BYTES) {
        return Err(AppError::BadRequest(format!(
            "File '{}' exceeds the 5 MB limit",
            file.file_name
        )));
    }

    let media = deps
        .media
        .as_ref()
        .ok_or_else(|| AppError::Configuration("Media storage is not configured".to_string()))?;

    let count = files.len();
    let urls = try_join_all(files.into_iter().map(|file| media.upload(file, UPLOAD_FOLDER)))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to upload files");
            AppError::UploadFailed
        })?;

    info!(count, "Files uploaded");
    Ok(urls)
}
