use std::sync::Arc;

use chrono::Duration;
use rand::{rngs::OsRng, RngCore};

use crate::{
    clock::Clock,
    domain::{ResetError, ResetToken, UserId},
    store::{AccountStore, StoreError},
};

/// 256 bits from the OS RNG, hex encoded.
pub const RESET_TOKEN_BYTES: usize = 32;

const MAX_ISSUE_ATTEMPTS: usize = 3;

pub fn generate_token_value() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues and retires single-use, time-limited password reset tokens.
pub struct ResetTokenLedger {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResetTokenLedger {
    pub fn new(store: Arc<dyn AccountStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Existing tokens for the user are left untouched.
    #[tracing::instrument(name = "Issue reset token", skip(self))]
    pub async fn issue(&self, user_id: UserId) -> Result<ResetToken, StoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = self.clock.now();
            let token = ResetToken {
                token: generate_token_value(),
                user_id,
                expires_at: now + self.ttl,
                used: false,
                created_at: now,
            };

            match self.store.insert_reset_token(&token).await {
                Ok(()) => return Ok(token),
                Err(StoreError::Duplicate) if attempt < MAX_ISSUE_ATTEMPTS => {
                    tracing::warn!(attempt, "Reset token collision, drawing a new value");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sets the owner's password hash and retires the token as one unit.
    #[tracing::instrument(name = "Consume reset token", skip(self, token, new_password_hash))]
    pub async fn validate_and_consume(
        &self,
        token: &str,
        new_password_hash: &str,
    ) -> Result<UserId, ResetError> {
        self.store
            .consume_reset_token(token, new_password_hash, self.clock.now())
            .await
    }
}
