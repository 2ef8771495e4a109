//! The response envelope the HTTP layer serializes.
//!
//! Every route answers `{success, data, error}`; the error carries a stable
//! machine code alongside the human message, and the HTTP status mirrors the
//! error kind.

use crate::error::FalloError;
use serde::{Deserialize, Serialize};

/// Structured error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl From<&FalloError> for ApiError {
    fn from(error: &FalloError) -> Self {
        Self {
            code: error_code(error).to_string(),
            message: error.to_string(),
        }
    }
}

/// Response envelope; `data` serializes as `null` when absent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Success with a payload
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success with no payload (mutations that return nothing)
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// Failure carrying the error's code and message
    pub fn failure(error: &FalloError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError::from(error)),
        }
    }
}

/// Stable machine-readable code for an error
pub fn error_code(error: &FalloError) -> &'static str {
    match error {
        FalloError::Validation(_)
        | FalloError::InvalidId(_)
        | FalloError::PositionOutOfRange { .. } => "validation_error",
        FalloError::BoardNotFound(_)
        | FalloError::ListNotFound(_)
        | FalloError::CardNotFound(_) => "not_found",
        FalloError::Unauthorized => "unauthorized",
        FalloError::Forbidden(_) => "forbidden",
        FalloError::Storage(_) | FalloError::Serialization(_) | FalloError::Internal(_) => {
            "internal_error"
        }
    }
}

/// HTTP status mirroring the error kind
pub fn http_status(error: &FalloError) -> u16 {
    match error {
        FalloError::Validation(_)
        | FalloError::InvalidId(_)
        | FalloError::PositionOutOfRange { .. } => 400,
        FalloError::Unauthorized => 401,
        FalloError::Forbidden(_) => 403,
        FalloError::BoardNotFound(_)
        | FalloError::ListNotFound(_)
        | FalloError::CardNotFound(_) => 404,
        FalloError::Storage(_) | FalloError::Serialization(_) | FalloError::Internal(_) => 500,
    }
}
