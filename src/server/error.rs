//! Error types for the REST API server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::estimation::EstimationError;
use crate::graph::GraphError;
use crate::panel::DataError;
use crate::store::StoreError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or inconsistent request input
    InvalidParameter(String),
    /// Dataset or graph has not been uploaded yet
    NotFound(String),
    /// Estimation rejected the stored inputs
    ComputationFailed(String),
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ComputationFailed(msg) => write!(f, "Computation failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ComputationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match self {
            ApiError::InvalidParameter(msg) => ("InvalidParameter", msg),
            ApiError::NotFound(msg) => ("NotFound", msg),
            ApiError::ComputationFailed(msg) => ("ComputationFailed", msg),
            ApiError::InternalError(msg) => ("InternalError", msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        }

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// Conversions from other error types

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::InvalidParameter(err.to_string())
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        ApiError::InvalidParameter(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Graph(err) => err.into(),
            StoreError::Data(err) => err.into(),
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<EstimationError> for ApiError {
    fn from(err: EstimationError) -> Self {
        match err {
            EstimationError::InvalidQuery(msg) => ApiError::InvalidParameter(msg),
            EstimationError::UnknownCause(_) => ApiError::InvalidParameter(err.to_string()),
            _ => ApiError::ComputationFailed(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::InvalidParameter(format!("Malformed upload: {}", err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("Worker task failed: {}", err))
    }
}
