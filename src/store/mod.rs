//! Persistence for users and reset tokens.
//!
//! Flows receive an `Arc<dyn AccountStore>` so they run unchanged against
//! PostgreSQL in production and the in-memory store in tests.
mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CredentialChange, NewUser, ProfileUpdate, ResetError, ResetToken, User, UserId};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("A unique constraint was violated")]
    Duplicate,

    #[error("A value does not fit its column")]
    ValueTooLong,

    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the username or email is taken.
    async fn insert_user(&self, new_user: NewUser) -> Result<UserId, StoreError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Match on username or email.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Apply the password hash and username together; either both land or neither.
    /// Returns `false` when the user does not exist.
    async fn update_credentials(
        &self,
        id: UserId,
        change: CredentialChange,
    ) -> Result<bool, StoreError>;

    async fn insert_reset_token(&self, token: &ResetToken) -> Result<(), StoreError>;

    async fn reset_tokens_for_user(&self, user_id: UserId) -> Result<Vec<ResetToken>, StoreError>;

    /// Check `token` at `now` and, if consumable, set the owner's password hash
    /// and mark the token used in one serialized unit.
    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, ResetError>;
}
