use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::classifier::ClassifierError;

/// Failures surfaced at the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("model not loaded")]
    ModelNotLoaded,
    #[error("could not process image: {0}")]
    Preprocessing(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("upload rejected: {0}")]
    UploadRejected(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UploadRejected(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Preprocessing(_) | ApiError::Inference(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::ModelNotLoaded => "model_not_loaded",
            ApiError::Preprocessing(_) => "preprocessing_failure",
            ApiError::Inference(_) => "inference_failure",
            ApiError::UploadRejected(_) => "upload_rejected",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Preprocessing(msg) => ApiError::Preprocessing(msg),
            ClassifierError::Inference(msg) => ApiError::Inference(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
