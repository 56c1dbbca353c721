//! Custom Axum extractors for the callable API.
//!
//! - `AuthenticatedUser`: verifies the `Authorization: Bearer` session token.
//! - `CallableJson<T>`: JSON body whose rejections use the callable error body.
//!
//! Token verification is delegated to [`gonggoo_sdk::signature`].

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use gonggoo_core::error::ServiceError;
use gonggoo_sdk::signature::{self, AUTHORIZATION_HEADER};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::state::AppState;

/// The caller identified by a valid session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(signature::strip_bearer)
            .ok_or(ApiError(ServiceError::Unauthenticated))?;

        let auth = state.config.auth.read().await;
        let claims = signature::verify_session_token(token, auth.session_secret()).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            ApiError(ServiceError::Unauthenticated)
        })?;
        drop(auth);

        Ok(AuthenticatedUser {
            user_id: claims.user_id,
        })
    }
}

/// JSON request body. Malformed input is an `INVALID_ARGUMENT` error.
pub struct CallableJson<T>(pub T);

impl<T: DeserializeOwned> FromRequest<AppState> for CallableJson<T> {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid_argument(rejection.body_text()))?;
        Ok(CallableJson(value))
    }
}
