use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::{domain::ResetError, store::StoreError, utils::error_chain_fmt};

#[derive(thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    ValidationError(String),

    #[error("username or email already exists")]
    DuplicateIdentity,

    /// Deliberately the same for unknown identities and wrong passwords.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("current password required")]
    ReauthenticationRequired,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("invalid token")]
    TokenNotFound,

    #[error("token already used")]
    TokenAlreadyUsed,

    #[error("token expired")]
    TokenExpired,

    #[error("user not found")]
    NotFound,

    #[error("internal error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl AccountError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => Self::DuplicateIdentity,
            StoreError::ValueTooLong => Self::validation("value too long"),
            StoreError::UnexpectedError(e) => Self::UnexpectedError(e),
        }
    }
}

impl From<ResetError> for AccountError {
    fn from(e: ResetError) -> Self {
        match e {
            ResetError::TokenNotFound => Self::TokenNotFound,
            ResetError::TokenAlreadyUsed => Self::TokenAlreadyUsed,
            ResetError::TokenExpired => Self::TokenExpired,
            ResetError::UnexpectedError(e) => Self::UnexpectedError(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl ResponseError for AccountError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_)
            | Self::TokenNotFound
            | Self::TokenAlreadyUsed
            | Self::TokenExpired => StatusCode::BAD_REQUEST,
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::ReauthenticationRequired | Self::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::UnexpectedError(_) = self {
            tracing::error!(error.cause_chain = ?self, "Request failed");
        }
        let response = ErrorResponse {
            message: self.to_string(),
        };
        HttpResponse::build(self.status_code()).json(response)
    }
}
