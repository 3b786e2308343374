use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::verification::VerificationError;

/// API error; the body is always `{ "error": message }` plus optional extras
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    InvalidCode {
        message: String,
        remaining_attempts: u32,
    },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Gone { message: String },

    #[error("{message}")]
    MethodNotAllowed {
        message: String,
        allow: &'static str,
    },

    #[error("{message}")]
    RateLimit {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } | ApiError::InvalidCode { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Gone { .. } => StatusCode::GONE,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::InvalidCode { .. } => "invalid_code",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Gone { .. } => "gone",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::RateLimit { .. } => "rate_limit_exceeded",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.to_string()));

        match self {
            ApiError::InvalidCode {
                remaining_attempts, ..
            } => {
                body.insert("remainingAttempts".to_string(), json!(remaining_attempts));
            }
            ApiError::RateLimit {
                retry_after_secs: Some(secs),
                ..
            } => {
                body.insert("retryAfterSeconds".to_string(), json!(secs));
            }
            _ => {}
        }

        Value::Object(body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        // Log the error with correlation ID
        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let mut response = (status_code, Json(self.body())).into_response();

        match &self {
            ApiError::MethodNotAllowed { allow, .. } => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static(*allow));
            }
            ApiError::RateLimit {
                retry_after_secs: Some(secs),
                ..
            } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*secs));
            }
            _ => {}
        }

        response
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        let message = err.to_string();
        match err {
            VerificationError::InvalidEmail => ApiError::BadRequest { message },
            VerificationError::NotFound => ApiError::NotFound { message },
            VerificationError::Expired => ApiError::Gone { message },
            VerificationError::InvalidCode { remaining_attempts } => ApiError::InvalidCode {
                message,
                remaining_attempts,
            },
            VerificationError::TooManyAttempts => ApiError::RateLimit {
                message,
                retry_after_secs: None,
            },
            VerificationError::Cooldown { retry_after_secs } => ApiError::RateLimit {
                message,
                retry_after_secs: Some(retry_after_secs),
            },
            VerificationError::Delivery(_) => ApiError::Internal {
                message: "Failed to deliver verification code".to_string(),
            },
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
