//! Wire form of [`ServiceError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gonggoo_core::error::ServiceError;
use gonggoo_sdk::objects::{ErrorBody, ErrorDetail, ErrorStatus};

/// Error returned by every callable handler.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(ServiceError::Database(err))
    }
}

impl ApiError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ApiError(ServiceError::InvalidArgument(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status == ErrorStatus::Internal {
            tracing::error!(error = %self.0, "Callable request failed");
        }
        let http_status =
            StatusCode::from_u16(status.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: ErrorDetail {
                status,
                message: self.0.public_message(),
                details: self.0.details(),
            },
        };
        (http_status, Json(body)).into_response()
    }
}
