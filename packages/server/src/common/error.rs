use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// One failed input rule, rendered in the `error` array of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            msg: msg.into(),
        }
    }
}

/// Request-level failures. Every variant is recovered at the HTTP boundary
/// and rendered as `{message, success: false}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    /// Rendered with status 303, the platform's "does not exist" convention.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Signature, expiry or format check failed on a session token.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Duplicate value for unique field(s): {0}. Please use a different value.")]
    Duplicate(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    TokenGeneration(String),

    /// The media store rejected or did not answer an upload.
    #[error("Failed to upload files")]
    UploadFailed,

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl AppError {
    /// Build a validation failure from collected field errors.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let joined = errors
            .iter()
            .map(|e| e.msg.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        AppError::Validation {
            message: format!("Validation failed: {}", joined),
            errors,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::Conflict(_)
            | AppError::InvalidOrExpiredOtp
            | AppError::InvalidRole(_)
            | AppError::Validation { .. }
            | AppError::Duplicate(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::SEE_OTHER,
            AppError::Unauthorized(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Configuration(_)
            | AppError::TokenGeneration(_)
            | AppError::UploadFailed
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internal failures are not echoed.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(sqlx::Error::Database(db_err)) = cause.downcast_ref::<sqlx::Error>() {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                    return AppError::Duplicate(constraint);
                }
            }
        }
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        anyhow::Error::from(err).into()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a [FieldError]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        }

        let errors = match &self {
            AppError::Validation { errors, .. } => Some(errors.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            message: self.public_message(),
            success: false,
            error: errors,
        };
        let body = serde_json::to_value(&body).unwrap_or_else(|_| {
            serde_json::json!({ "message": "Internal Server Error", "success": false })
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("User does not exist".into()).status_code(),
            StatusCode::SEE_OTHER
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidOrExpiredOtp.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::NotImplemented("x".into()).status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            AppError::Configuration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_joins_field_messages() {
        let err = AppError::validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("email", "Invalid email"),
        ]);
        assert_eq!(err.to_string(), "Validation failed: Name is required, Invalid email");
    }

    #[tokio::test]
    async fn test_envelope_without_field_errors() {
        let response = AppError::Conflict("Agent already exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Agent already exists");
        assert_eq!(json["success"], false);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_envelope_with_field_errors() {
        let response =
            AppError::validation(vec![FieldError::new("title", "Title is required")])
                .into_response();

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"][0]["path"], "title");
        assert_eq!(json["error"][0]["msg"], "Title is required");
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_echoed() {
        let response =
            AppError::from(anyhow::anyhow!("connection refused to 10.0.0.3")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Internal Server Error");
    }
}
