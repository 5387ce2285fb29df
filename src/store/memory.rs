use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{AccountStore, StoreError};
use crate::domain::{
    CredentialChange, NewUser, ProfileUpdate, ResetError, ResetToken, User, UserId,
};

#[derive(Default)]
struct State {
    next_id: i32,
    users: HashMap<UserId, User>,
    reset_tokens: HashMap<String, ResetToken>,
}

impl State {
    fn identity_taken(&self, username: &str, email: Option<&str>, except: Option<UserId>) -> bool {
        self.users.values().any(|user| {
            Some(user.id) != except
                && (user.username == username
                    || (email.is_some() && user.email.as_deref() == email))
        })
    }
}

/// Store held entirely in process memory. Every operation runs under one lock,
/// which makes each call atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<UserId, StoreError> {
        let mut state = self.state.lock().await;
        if state.identity_taken(&new_user.username, new_user.email.as_deref(), None) {
            return Err(StoreError::Duplicate);
        }

        state.next_id += 1;
        let id = UserId(state.next_id);
        let now = Utc::now();
        state.users.insert(
            id,
            User {
                id,
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                full_name: None,
                phone: None,
                gender: None,
                date_of_birth: None,
                address: None,
                ward: None,
                district: None,
                city: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        let user = state
            .users
            .values()
            .filter(|u| u.username == login || u.email.as_deref() == Some(login))
            .min_by_key(|u| u.id.0)
            .cloned();
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        update.apply_to(user);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_credentials(
        &self,
        id: UserId,
        change: CredentialChange,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        if let Some(username) = change.username.as_deref() {
            if state.identity_taken(username, None, Some(id)) {
                return Err(StoreError::Duplicate);
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(hash) = change.password_hash {
            user.password_hash = hash;
        }
        if let Some(username) = change.username {
            user.username = username;
        }
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_reset_token(&self, token: &ResetToken) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.reset_tokens.contains_key(&token.token) {
            return Err(StoreError::Duplicate);
        }
        state.reset_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn reset_tokens_for_user(&self, user_id: UserId) -> Result<Vec<ResetToken>, StoreError> {
        let state = self.state.lock().await;
        let mut tokens: Vec<ResetToken> = state
            .reset_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, ResetError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let record = state
            .reset_tokens
            .get_mut(token)
            .ok_or(ResetError::TokenNotFound)?;
        if let Some(rejection) = record.rejection_at(now) {
            return Err(rejection);
        }

        let owner = record.user_id;
        let user = state.users.get_mut(&owner).ok_or_else(|| {
            ResetError::UnexpectedError(anyhow::anyhow!(
                "Reset token refers to missing user {owner}"
            ))
        })?;
        user.password_hash = new_password_hash.to_string();
        user.updated_at = now;
        record.used = true;

        Ok(owner)
    }
}
