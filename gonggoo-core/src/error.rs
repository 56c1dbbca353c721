//! Errors surfaced by the callable operations.

use gonggoo_sdk::objects::ErrorStatus;
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{message}")]
    FailedPrecondition {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{context}: {source}")]
    Gateway {
        context: &'static str,
        #[source]
        source: GatewayError,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn precondition(message: impl Into<String>) -> Self {
        ServiceError::FailedPrecondition {
            message: message.into(),
            details: None,
        }
    }

    pub fn gateway(context: &'static str, source: GatewayError) -> Self {
        ServiceError::Gateway { context, source }
    }

    /// Wire status for this error.
    ///
    /// A gateway rejection is the caller's problem (bad amount, already
    /// cancelled, ...), so it maps to a precondition failure. Transport
    /// failures are internal.
    pub fn status(&self) -> ErrorStatus {
        match self {
            ServiceError::Unauthenticated => ErrorStatus::Unauthenticated,
            ServiceError::InvalidArgument(_) => ErrorStatus::InvalidArgument,
            ServiceError::PermissionDenied(_) => ErrorStatus::PermissionDenied,
            ServiceError::FailedPrecondition { .. } => ErrorStatus::FailedPrecondition,
            ServiceError::NotFound(_) => ErrorStatus::NotFound,
            ServiceError::Gateway {
                source: GatewayError::Rejected { .. },
                ..
            } => ErrorStatus::FailedPrecondition,
            ServiceError::Gateway { .. } | ServiceError::Database(_) | ServiceError::Internal(_) => {
                ErrorStatus::Internal
            }
        }
    }

    /// Message safe to show the caller. Internal causes are not leaked.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Gateway {
                context,
                source: GatewayError::Rejected { message, .. },
            } => format!("{context}: {message}"),
            ServiceError::Gateway { context, .. } => format!("{context}: gateway unavailable"),
            ServiceError::Database(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::FailedPrecondition { details, .. } => details.clone(),
            ServiceError::Gateway {
                source: GatewayError::Rejected { body, .. },
                ..
            } => Some(body.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> GatewayError {
        GatewayError::Rejected {
            status: 400,
            code: "ALREADY_CANCELED_PAYMENT".to_string(),
            message: "already cancelled".to_string(),
            body: serde_json::json!({"code": "ALREADY_CANCELED_PAYMENT", "message": "already cancelled"}),
        }
    }

    #[test]
    fn gateway_rejection_is_precondition_with_payload() {
        let err = ServiceError::gateway("payment cancellation failed", rejected());
        assert_eq!(err.status(), ErrorStatus::FailedPrecondition);
        assert_eq!(
            err.public_message(),
            "payment cancellation failed: already cancelled"
        );
        assert_eq!(
            err.details().unwrap()["code"],
            "ALREADY_CANCELED_PAYMENT"
        );
    }

    #[test]
    fn database_errors_do_not_leak() {
        let err = ServiceError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), ErrorStatus::Internal);
        assert_eq!(err.public_message(), "internal error");
        assert!(err.details().is_none());
    }

    #[test]
    fn gateway_decode_failure_is_internal() {
        let err = ServiceError::gateway(
            "payment confirmation failed",
            GatewayError::Decode("expected object".to_string()),
        );
        assert_eq!(err.status(), ErrorStatus::Internal);
    }
}
