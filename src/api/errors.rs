// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! API error taxonomy
//!
//! Most failures are reported in-band: the response is HTTP 200 with an
//! `error` field, matching what UI clients of this service expect. Only
//! request-shape problems (missing multipart file) and genuine internal
//! faults use a non-2xx status.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Serialized error payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Request shape is wrong (e.g. missing multipart `file` part)
    ValidationError { field: String, message: String },
    /// Upload could not be decoded as an image
    InvalidImage,
    /// No model loaded for the requested operation
    ModelNotLoaded(String),
    /// Switch target is not one of the known model names
    UnknownModel { model: String },
    /// The model invocation itself failed
    DetectionFailed(String),
    /// Service is running without a database
    StoreUnavailable,
    /// A store read/update failed
    StoreError(String),
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // In-band errors ride on a 200 response
            _ => StatusCode::OK,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (error, details) = match self {
            ApiError::ValidationError { field, message } => (
                message.clone(),
                Some(serde_json::json!({ "field": field })),
            ),
            ApiError::InvalidImage => (
                "Invalid image file. Please upload a valid image file (JPEG, PNG, etc.)."
                    .to_string(),
                None,
            ),
            ApiError::ModelNotLoaded(msg) => (msg.clone(), None),
            ApiError::UnknownModel { .. } => (
                "Invalid model name. Use 'weapon' or 'fire_smoke'".to_string(),
                None,
            ),
            ApiError::DetectionFailed(details) => (
                "Detection failed".to_string(),
                Some(serde_json::Value::String(details.clone())),
            ),
            ApiError::StoreUnavailable => ("Database not available".to_string(), None),
            ApiError::StoreError(msg) => (msg.clone(), None),
            ApiError::InternalError(msg) => (msg.clone(), None),
        };

        ErrorResponse { error, details }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InvalidImage => write!(f, "Invalid image file"),
            ApiError::ModelNotLoaded(msg) => write!(f, "{}", msg),
            ApiError::UnknownModel { model } => write!(f, "Unknown model '{}'", model),
            ApiError::DetectionFailed(details) => write!(f, "Detection failed: {}", details),
            ApiError::StoreUnavailable => write!(f, "Database not available"),
            ApiError::StoreError(msg) => write!(f, "Store error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), axum::response::Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_422() {
        let err = ApiError::ValidationError {
            field: "file".to_string(),
            message: "file is required".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_response().error, "file is required");
    }

    #[test]
    fn test_in_band_errors_are_200() {
        assert_eq!(ApiError::InvalidImage.status_code(), StatusCode::OK);
        assert_eq!(
            ApiError::ModelNotLoaded("Model not loaded".to_string()).status_code(),
            StatusCode::OK
        );
        assert_eq!(ApiError::StoreUnavailable.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_invalid_image_message() {
        let response = ApiError::InvalidImage.to_response();
        assert!(response.error.contains("Invalid image file"));
    }

    #[test]
    fn test_unknown_model_message_names_valid_set() {
        let err = ApiError::UnknownModel {
            model: "person".to_string(),
        };
        let response = err.to_response();
        assert!(response.error.contains("weapon"));
        assert!(response.error.contains("fire_smoke"));
    }

    #[test]
    fn test_detection_failed_carries_details() {
        let err = ApiError::DetectionFailed("session run failed".to_string());
        let response = err.to_response();
        assert_eq!(response.error, "Detection failed");
        assert_eq!(
            response.details,
            Some(serde_json::Value::String("session run failed".to_string()))
        );
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let json = serde_json::to_value(ApiError::StoreUnavailable.to_response()).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["error"], "Database not available");
    }
}
