use anyhow::{Context, Error};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};

use crate::{configuration::HashingSettings, telemetry::spawn_blocking_with_tracing};

/// Hash `password` into a self-describing PHC string: algorithm, version,
/// cost parameters and salt are embedded so verification needs nothing else.
pub fn compute_password_hash(password: &str, settings: HashingSettings) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(
        settings.effective_memory_kib(),
        settings.effective_work_factor(),
        Params::DEFAULT_P_COST,
        None,
    )
    .map_err(Error::msg)?;

    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(Error::msg)?
        .to_string();

    Ok(password_hash)
}

/// Fails closed: an unparsable stored hash never verifies.
pub fn verify_password_hash(expected_password_hash: &str, password_candidate: &str) -> bool {
    let Ok(expected_password_hash) = PasswordHash::new(expected_password_hash) else {
        tracing::warn!("Stored password hash could not be parsed");
        return false;
    };

    Argon2::default()
        .verify_password(password_candidate.as_bytes(), &expected_password_hash)
        .is_ok()
}

#[tracing::instrument(name = "Compute password hash", skip(password))]
pub async fn hash_password(password: String, settings: HashingSettings) -> Result<String, Error> {
    spawn_blocking_with_tracing(move || compute_password_hash(&password, settings))
        .await
        .context("Failed to spawn blocking task.")?
}

#[tracing::instrument(name = "Verify password hash", skip(expected_password_hash, password_candidate))]
pub async fn verify_password(
    expected_password_hash: String,
    password_candidate: String,
) -> Result<bool, Error> {
    spawn_blocking_with_tracing(move || {
        verify_password_hash(&expected_password_hash, &password_candidate)
    })
    .await
    .context("Failed to spawn blocking task.")
}
