use serde::Serialize;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;
use crate::services::StoreError;
use crate::utils::firestore_codec::CodecError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_withdrawal: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{message}")]
    WithdrawalClosed { message: String, next_withdrawal: String },
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        ApiError::Store(StoreError::Codec(e))
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Duplicate(_) => "DUPLICATE_ERROR",
            ApiError::WithdrawalClosed { .. } => "WITHDRAWAL_CLOSED",
            ApiError::Store(StoreError::NotFound(_)) => "NOT_FOUND",
            ApiError::Store(_) => "DATABASE_ERROR",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::WithdrawalClosed { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Duplicate(_) | ApiError::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error, next_withdrawal) = match self {
            // storage failures are logged, not echoed to the browser
            ApiError::Store(StoreError::NotFound(msg)) => (msg.clone(), None),
            ApiError::Store(_) => ("Internal server error".to_string(), None),
            ApiError::WithdrawalClosed { message, next_withdrawal } => {
                (message.clone(), Some(next_withdrawal.clone()))
            }
            _ => (self.to_string(), None),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error,
            code: self.code().to_string(),
            details: None,
            next_withdrawal,
        })
    }
}
