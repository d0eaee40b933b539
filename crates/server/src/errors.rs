use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use models::ModelError;
use service::ServiceError;
use thiserror::Error;
use tracing::error;

/// Request failure; every variant renders as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// `message` goes to the client, `detail` only to the log.
    #[error("{message}: {detail}")]
    Internal { message: &'static str, detail: String },
}

impl ApiError {
    pub fn internal(message: &'static str, detail: impl ToString) -> Self {
        Self::Internal { message, detail: detail.to_string() }
    }

    /// Map a service failure on the primary path; store errors become 500
    /// with the given client message.
    pub fn from_service(err: ServiceError, message: &'static str) -> Self {
        match err {
            ServiceError::Model(e) => e.into(),
            ServiceError::Validation(msg) => Self::InvalidRequest(msg),
            ServiceError::Store(detail) => Self::Internal { message, detail },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        let msg = match e {
            ModelError::InvalidJson(_) => "Invalid JSON",
            ModelError::UnknownOperation(_) => "Invalid operation",
            ModelError::OperationMismatch { .. } | ModelError::EmptyCookie => "Invalid request",
            ModelError::InvalidQty(_) => "Invalid qty parameter",
        };
        ApiError::InvalidRequest(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match self {
            ApiError::Internal { message, detail } => {
                error!(error = %detail, "{message}");
                message.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({"error": msg}))).into_response()
    }
}
