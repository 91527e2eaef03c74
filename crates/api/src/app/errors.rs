//! Error → response mapping.
//!
//! Every failure leaves the API as the shared envelope
//! `{ "success": false, "message": ... }` with a matching status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use backoffice_auth::{AuthzError, JwtError, PasswordError};
use backoffice_core::{ApiResponse, DomainError};
use backoffice_infra::StoreError;

/// Failure of a service operation, before it is rendered.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Authentication failed; the message is deliberately generic.
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("token error: {0}")]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Domain(DomainError::NotFound) | ApiError::Store(StoreError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Domain(DomainError::Conflict(_)) | ApiError::Store(StoreError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Unauthorized(_)
            | ApiError::Token(JwtError::Invalid | JwtError::WrongType { .. } | JwtError::Claims(_)) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Password(PasswordError::Length | PasswordError::Weak) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_)
            | ApiError::Token(JwtError::Signing(_))
            | ApiError::Password(PasswordError::Hash(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            ApiError::Domain(DomainError::Validation(msg)) => msg.clone(),
            ApiError::Domain(DomainError::NotFound) | ApiError::Store(StoreError::NotFound) => {
                "Record not found".to_string()
            }
            ApiError::Token(_) => "Invalid or expired token".to_string(),
            ApiError::Store(StoreError::Conflict(_)) => "Record already exists".to_string(),
            ApiError::Store(StoreError::Unavailable(_)) => "Service temporarily unavailable".to_string(),
            other if other.status().is_server_error() => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Listing failures keep their `Error Occurred:` prefix over the
    /// client-facing message.
    pub fn into_listing_response(self) -> Response {
        match &self {
            ApiError::Forbidden(_) => self.into_response(),
            _ => {
                tracing::error!(error = %self, "listing failed");
                json_error(self.status(), format!("Error Occurred: {}", self.message()))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        json_error(status, self.message())
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::failure(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::from(DomainError::validation("email: invalid")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Conflict("users_email_live_idx".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthzError::Forbidden("VIEW_USER".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::from(JwtError::Invalid).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(StoreError::Corrupt("bad row".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let err = ApiError::from(StoreError::Corrupt("users.password_hash".into()));
        assert_eq!(err.message(), "Internal server error");

        let err = ApiError::from(DomainError::validation("fullName: too short"));
        assert_eq!(err.message(), "fullName: too short");
    }

    async fn envelope(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn listing_failures_keep_prefix_without_internals() {
        let err = ApiError::from(StoreError::Corrupt("users.role_ids: column decode failed".into()));
        let (status, body) = envelope(err.into_listing_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error Occurred: Internal server error");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn forbidden_listing_is_a_plain_403() {
        let err = ApiError::from(AuthzError::Forbidden("VIEW_FAQ".into()));
        let (status, body) = envelope(err.into_listing_response()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!body["message"].as_str().unwrap().starts_with("Error Occurred"));
    }
}
