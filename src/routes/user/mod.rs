mod credentials;
mod get;
mod put;

pub use credentials::*;
pub use get::*;
pub use put::*;

use crate::{accounts::AccountError, authentication::Claims, domain::UserId};

/// The bearer token must belong to the user addressed in the path.
fn authorize(claims: &Claims, id: UserId) -> Result<(), AccountError> {
    match claims.user_id() {
        Some(subject) if subject == id => Ok(()),
        _ => Err(AccountError::Unauthenticated),
    }
}
