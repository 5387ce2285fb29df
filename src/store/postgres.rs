use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::{AccountStore, StoreError};
use crate::domain::{
    CredentialChange, NewUser, ProfileUpdate, ResetError, ResetToken, User, UserId,
};

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, full_name, phone, gender, date_of_birth,
    address, ward, district, city, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(e: sqlx::Error, context: &'static str) -> StoreError {
    match &e {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => StoreError::Duplicate,
        // string_data_right_truncation
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some("22001") => {
            StoreError::ValueTooLong
        }
        _ => StoreError::UnexpectedError(anyhow::Error::new(e).context(context)),
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    #[tracing::instrument(name = "Insert user", skip(self, new_user), fields(username = %new_user.username))]
    async fn insert_user(&self, new_user: NewUser) -> Result<UserId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to insert a new user."))?;

        Ok(row.get("id"))
    }

    #[tracing::instrument(name = "Find user by id", skip(self))]
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by id.")?;
        Ok(user)
    }

    #[tracing::instrument(name = "Find user by login", skip(self, login))]
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by username or email.")?;
        Ok(user)
    }

    #[tracing::instrument(name = "Find user by email", skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email.")?;
        Ok(user)
    }

    #[tracing::instrument(name = "Update user profile", skip(self, update))]
    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                gender = COALESCE($4, gender),
                date_of_birth = COALESCE($5, date_of_birth),
                address = COALESCE($6, address),
                ward = COALESCE($7, ward),
                district = COALESCE($8, district),
                city = COALESCE($9, city),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.full_name)
        .bind(update.phone)
        .bind(update.gender)
        .bind(update.date_of_birth)
        .bind(update.address)
        .bind(update.ward)
        .bind(update.district)
        .bind(update.city)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update user profile."))?;
        Ok(user)
    }

    #[tracing::instrument(name = "Update user credentials", skip(self, change))]
    async fn update_credentials(
        &self,
        id: UserId,
        change: CredentialChange,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = COALESCE($2, password_hash),
                username = COALESCE($3, username),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(change.password_hash)
        .bind(change.username)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update user credentials."))?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Store reset token", skip(self, token), fields(user_id = %token.user_id))]
    async fn insert_reset_token(&self, token: &ResetToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (token, user_id, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to store reset token."))?;
        Ok(())
    }

    #[tracing::instrument(name = "List reset tokens", skip(self))]
    async fn reset_tokens_for_user(&self, user_id: UserId) -> Result<Vec<ResetToken>, StoreError> {
        let tokens = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT token, user_id, expires_at, used, created_at
            FROM password_resets
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list reset tokens.")?;
        Ok(tokens)
    }

    #[tracing::instrument(name = "Consume reset token", skip(self, token, new_password_hash))]
    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, ResetError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a Postgres connection from the pool.")?;

        // The row lock serializes concurrent consumers of the same token; the
        // loser re-reads `used = TRUE` once the winner commits.
        let record = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT token, user_id, expires_at, used, created_at
            FROM password_resets
            WHERE token = $1
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *transaction)
        .await
        .context("Failed to look up reset token.")?
        .ok_or(ResetError::TokenNotFound)?;

        if let Some(rejection) = record.rejection_at(now) {
            return Err(rejection);
        }

        let marked = sqlx::query(
            "UPDATE password_resets SET used = TRUE WHERE token = $1 AND used = FALSE",
        )
        .bind(token)
        .execute(&mut *transaction)
        .await
        .context("Failed to mark reset token as used.")?;
        if marked.rows_affected() != 1 {
            return Err(ResetError::TokenAlreadyUsed);
        }

        let updated = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2",
        )
        .bind(new_password_hash)
        .bind(record.user_id)
        .execute(&mut *transaction)
        .await
        .context("Failed to update password from reset token.")?;
        if updated.rows_affected() != 1 {
            return Err(ResetError::UnexpectedError(anyhow::anyhow!(
                "Reset token refers to missing user {}",
                record.user_id
            )));
        }

        transaction
            .commit()
            .await
            .context("Failed to commit password reset.")?;
        Ok(record.user_id)
    }
}
