//! Error body returned by every callable endpoint.

use serde::{Deserialize, Serialize};

/// Canonical error codes of the callable API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorStatus {
    Unauthenticated,
    InvalidArgument,
    PermissionDenied,
    FailedPrecondition,
    NotFound,
    Internal,
}

impl ErrorStatus {
    /// HTTP status code paired with each error code.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorStatus::Unauthenticated => 401,
            ErrorStatus::InvalidArgument => 400,
            ErrorStatus::PermissionDenied => 403,
            ErrorStatus::FailedPrecondition => 412,
            ErrorStatus::NotFound => 404,
            ErrorStatus::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub status: ErrorStatus,
    pub message: String,
    /// Raw gateway error payload, when the failure came from the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}
