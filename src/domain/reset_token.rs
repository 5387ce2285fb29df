use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::UserId;

#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    /// Classify why this token cannot be consumed at `now`, if it cannot.
    pub fn rejection_at(&self, now: DateTime<Utc>) -> Option<ResetError> {
        if self.used {
            Some(ResetError::TokenAlreadyUsed)
        } else if now >= self.expires_at {
            Some(ResetError::TokenExpired)
        } else {
            None
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ResetError {
    #[error("invalid token")]
    TokenNotFound,

    #[error("token already used")]
    TokenAlreadyUsed,

    #[error("token expired")]
    TokenExpired,

    #[error("Failed to consume the reset token")]
    UnexpectedError(#[from] anyhow::Error),
}
