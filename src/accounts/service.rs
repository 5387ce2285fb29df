use std::sync::Arc;

use serde::Deserialize;

use super::{ledger::generate_token_value, AccountError, ResetTokenLedger};
use crate::{
    authentication::{compute_password_hash, hash_password, verify_password, JwtKeys},
    clock::Clock,
    configuration::{HashingSettings, Settings},
    domain::{
        check_length, CredentialChange, NewUser, ProfileUpdate, User, UserId, MAX_EMAIL_CHARS,
        MAX_USERNAME_CHARS,
    },
    email::{templates, NotificationDispatcher},
    store::AccountStore,
    utils::{is_valid_email, non_blank},
};

pub const FORGOT_PASSWORD_MESSAGE: &str = "If that email exists, a reset link has been sent.";

#[derive(Clone)]
pub struct AccountSettings {
    pub hashing: HashingSettings,
    pub base_url: String,
    pub reset_path: String,
    pub reset_token_ttl_minutes: i64,
}

impl AccountSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            hashing: settings.hashing,
            base_url: settings.application.base_url.clone(),
            reset_path: settings.password_reset.reset_path.clone(),
            reset_token_ttl_minutes: settings.password_reset.token_ttl_minutes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginAttempt {
    /// Username or email.
    pub login: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdate {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub new_username: Option<String>,
    #[serde(default)]
    pub send_confirmation_email: bool,
}

pub struct LoginSuccess {
    pub user: User,
    pub token: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Sequences store, hasher, reset ledger and notifications into the
/// user-facing account flows. Holds no per-request state.
pub struct Accounts {
    store: Arc<dyn AccountStore>,
    ledger: ResetTokenLedger,
    notifier: NotificationDispatcher,
    jwt: Arc<JwtKeys>,
    settings: AccountSettings,
    // Verified against when the login identity is unknown, so both paths pay
    // for one hash verification.
    dummy_hash: String,
}

impl Accounts {
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: NotificationDispatcher,
        jwt: Arc<JwtKeys>,
        settings: AccountSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, anyhow::Error> {
        let ledger = ResetTokenLedger::new(
            store.clone(),
            clock,
            chrono::Duration::minutes(settings.reset_token_ttl_minutes),
        );
        let dummy_hash = compute_password_hash(&generate_token_value(), settings.hashing)?;

        Ok(Self {
            store,
            ledger,
            notifier,
            jwt,
            settings,
            dummy_hash,
        })
    }

    pub fn jwt_keys(&self) -> Arc<JwtKeys> {
        self.jwt.clone()
    }

    #[tracing::instrument(name = "Register user", skip(self, registration), fields(username = tracing::field::Empty))]
    pub async fn register(&self, registration: Registration) -> Result<UserId, AccountError> {
        let (Some(username), Some(password)) = (
            non_blank(registration.username),
            non_empty(registration.password),
        ) else {
            return Err(AccountError::validation("username and password required"));
        };
        check_length("username", &username, MAX_USERNAME_CHARS).map_err(AccountError::validation)?;
        tracing::Span::current().record("username", tracing::field::display(&username));

        let email = non_blank(registration.email);
        if let Some(email) = email.as_deref() {
            check_length("email", email, MAX_EMAIL_CHARS).map_err(AccountError::validation)?;
            if !is_valid_email(email) {
                return Err(AccountError::validation("invalid email format"));
            }
        }

        let password_hash = hash_password(password, self.settings.hashing).await?;
        let user_id = self
            .store
            .insert_user(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        tracing::info!(%user_id, "User registered");
        Ok(user_id)
    }

    #[tracing::instrument(name = "Login", skip(self, attempt))]
    pub async fn login(&self, attempt: LoginAttempt) -> Result<LoginSuccess, AccountError> {
        let (Some(identifier), Some(password)) = (
            non_blank(attempt.login.or(attempt.username)),
            non_empty(attempt.password),
        ) else {
            return Err(AccountError::validation(
                "login (username/email) and password required",
            ));
        };

        let user = self.store.find_user_by_login(&identifier).await?;
        let expected_hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let is_valid = verify_password(expected_hash, password).await?;

        match user {
            Some(user) if is_valid => {
                let token = self.jwt.generate_token(user.id)?;
                tracing::info!(user_id = %user.id, "Login succeeded");
                Ok(LoginSuccess { user, token })
            }
            _ => Err(AccountError::InvalidCredentials),
        }
    }

    /// Responds identically whether or not `email` belongs to an account.
    #[tracing::instrument(name = "Forgot password", skip(self, email))]
    pub async fn forgot_password(&self, email: Option<String>) -> Result<(), AccountError> {
        let email = non_blank(email).ok_or_else(|| AccountError::validation("email required"))?;
        if !is_valid_email(&email) {
            return Err(AccountError::validation("invalid email format"));
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::info!("Password reset requested for an unknown email");
            return Ok(());
        };

        let token = self.ledger.issue(user.id).await?;
        let reset_url = format!(
            "{}{}?token={}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.reset_path,
            token.token
        );
        let queued = self.notifier.dispatch(templates::password_reset_email(
            &email,
            &reset_url,
            self.settings.reset_token_ttl_minutes,
        ));
        tracing::info!(user_id = %user.id, queued, "Password reset token issued");
        Ok(())
    }

    #[tracing::instrument(name = "Reset password", skip(self, token, password))]
    pub async fn reset_password(
        &self,
        token: Option<String>,
        password: Option<String>,
    ) -> Result<(), AccountError> {
        let (Some(token), Some(password)) = (non_blank(token), non_empty(password)) else {
            return Err(AccountError::validation("token and password required"));
        };

        let password_hash = hash_password(password, self.settings.hashing).await?;
        let user_id = self
            .ledger
            .validate_and_consume(&token, &password_hash)
            .await?;

        tracing::info!(%user_id, "Password reset");
        Ok(())
    }

    /// The caller must already be authenticated as `user_id`.
    #[tracing::instrument(name = "Change credentials", skip(self, update))]
    pub async fn change_credentials(
        &self,
        user_id: UserId,
        update: CredentialUpdate,
    ) -> Result<(), AccountError> {
        let new_password = non_empty(update.new_password);
        let new_username = non_blank(update.new_username);
        if new_password.is_none() && new_username.is_none() {
            return Err(AccountError::validation(
                "newPassword or newUsername required",
            ));
        }
        if let Some(new_username) = new_username.as_deref() {
            check_length("newUsername", new_username, MAX_USERNAME_CHARS)
                .map_err(AccountError::validation)?;
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AccountError::NotFound)?;

        let mut change = CredentialChange::default();
        if let Some(new_password) = new_password {
            let current_password =
                non_empty(update.current_password).ok_or(AccountError::ReauthenticationRequired)?;
            if !verify_password(user.password_hash.clone(), current_password).await? {
                return Err(AccountError::InvalidCredentials);
            }
            change.password_hash = Some(hash_password(new_password, self.settings.hashing).await?);
        }
        if let Some(new_username) = new_username {
            if new_username != user.username {
                change.username = Some(new_username);
            }
        }

        let username = change.username.clone().unwrap_or(user.username);
        if !change.is_empty() && !self.store.update_credentials(user_id, change).await? {
            return Err(AccountError::NotFound);
        }
        tracing::info!(%user_id, "Credentials changed");

        if update.send_confirmation_email {
            match user.email.as_deref() {
                Some(email) => {
                    self.notifier
                        .dispatch(templates::credentials_changed_email(email, &username));
                }
                None => tracing::info!(%user_id, "No email on file for confirmation"),
            }
        }
        Ok(())
    }

    #[tracing::instrument(name = "Get profile", skip(self))]
    pub async fn get_profile(&self, user_id: UserId) -> Result<User, AccountError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    #[tracing::instrument(name = "Update profile", skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        update.validate().map_err(AccountError::validation)?;
        self.store
            .update_profile(user_id, update)
            .await?
            .ok_or(AccountError::NotFound)
    }
}
