// HTTP routes
pub mod courses;
pub mod generation;
pub mod health;
pub mod jobs;
pub mod stream;

pub use courses::*;
pub use generation::*;
pub use health::*;
pub use jobs::*;
pub use stream::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::domains::generation::RequestError;
use crate::kernel::JobError;

/// Error returned by JSON handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        let status = if let Some(JobError::NotFound(_)) = e.downcast_ref::<JobError>() {
            StatusCode::NOT_FOUND
        } else if let Some(request_error) = e.downcast_ref::<RequestError>() {
            match request_error {
                RequestError::CourseNotFound(_) => StatusCode::NOT_FOUND,
                RequestError::InvalidReferenceKey(_) | RequestError::JobMismatch { .. } => {
                    StatusCode::BAD_REQUEST
                }
                RequestError::StructureNotReady(_) => StatusCode::CONFLICT,
            }
        } else if e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
            .any(|io| io.kind() == std::io::ErrorKind::NotFound)
        {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = format!("{:#}", e), "Request failed");
        }

        Self {
            status,
            message: format!("{:#}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
