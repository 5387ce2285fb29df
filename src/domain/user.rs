use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i32);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column widths of the `users` table, counted in characters.
pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 100;

/// `Err` names the field when `value` is longer than `max` characters.
pub fn check_length(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        Err(format!("{field} must be at most {max} characters"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("fullName", &self.full_name, 100),
            ("phone", &self.phone, 30),
            ("gender", &self.gender, 20),
            ("dateOfBirth", &self.date_of_birth, 20),
            ("address", &self.address, 255),
            ("ward", &self.ward, 100),
            ("district", &self.district, 100),
            ("city", &self.city, 100),
        ];
        for (field, value, max) in fields {
            if let Some(value) = value {
                check_length(field, value, max)?;
            }
        }
        Ok(())
    }

    pub fn apply_to(self, user: &mut User) {
        let ProfileUpdate {
            full_name,
            phone,
            gender,
            date_of_birth,
            address,
            ward,
            district,
            city,
        } = self;
        let fields = [
            (&mut user.full_name, full_name),
            (&mut user.phone, phone),
            (&mut user.gender, gender),
            (&mut user.date_of_birth, date_of_birth),
            (&mut user.address, address),
            (&mut user.ward, ward),
            (&mut user.district, district),
            (&mut user.city, city),
        ];
        for (slot, value) in fields {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

/// A credential rotation written in one store call.
#[derive(Debug, Clone, Default)]
pub struct CredentialChange {
    pub password_hash: Option<String>,
    pub username: Option<String>,
}

impl CredentialChange {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.username.is_none()
    }
}

/// What callers get to see of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            gender: user.gender,
            date_of_birth: user.date_of_birth,
            address: user.address,
            ward: user.ward,
            district: user.district,
            city: user.city,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
