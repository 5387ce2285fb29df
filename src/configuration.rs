use std::time::Duration;

use argon2::Params;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub hashing: HashingSettings,
    pub jwt: JwtSettings,
    pub email: EmailSettings,
    pub password_reset: PasswordResetSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public origin used when building links sent by email.
    pub base_url: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub require_ssl: bool,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database_name)
            .ssl_mode(ssl_mode)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Argon2 cost parameters.
///
/// `work_factor` is the iteration count. Both values are clamped to a floor
/// before use so a misconfigured deployment cannot produce trivially cheap
/// hashes.
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct HashingSettings {
    pub work_factor: u32,
    pub memory_kib: u32,
}

pub const MIN_WORK_FACTOR: u32 = 2;

impl HashingSettings {
    pub fn effective_work_factor(&self) -> u32 {
        self.work_factor.max(MIN_WORK_FACTOR)
    }

    pub fn effective_memory_kib(&self) -> u32 {
        self.memory_kib.max(Params::MIN_M_COST)
    }
}

/// Shipped in `base.yaml` for local use only.
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expires_in_minutes: i64,
}

impl JwtSettings {
    pub fn validate_for(&self, environment: Environment) -> Result<(), String> {
        if environment != Environment::Production {
            return Ok(());
        }
        if self.secret == PLACEHOLDER_JWT_SECRET {
            return Err("jwt.secret is still the placeholder value; set APP_JWT__SECRET".into());
        }
        if self.secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(format!(
                "jwt.secret must be at least {MIN_JWT_SECRET_BYTES} bytes in production"
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Clone)]
pub struct EmailSettings {
    pub sender: String,
    /// When absent, mail goes to the sandbox sender instead of SMTP.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub timeout_milliseconds: u64,
    pub max_attempts: u32,
    pub queue_capacity: usize,
}

impl EmailSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// The sandbox sender never delivers mail, so production needs SMTP.
    pub fn validate_for(&self, environment: Environment) -> Result<(), String> {
        match (environment, self.smtp_host.as_deref().map(str::trim)) {
            (Environment::Production, None | Some("")) => {
                Err("email.smtp_host is required in production; set APP_EMAIL__SMTP_HOST".into())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct PasswordResetSettings {
    pub token_ttl_minutes: i64,
    pub reset_path: String,
}

impl Settings {
    pub fn validate_for(&self, environment: Environment) -> Result<(), String> {
        self.jwt.validate_for(environment)?;
        self.email.validate_for(environment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("Failed to determine the current directory: {e}")))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // APP_DATABASE__HOST=db would set `Settings.database.host`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings
        .validate_for(environment)
        .map_err(config::ConfigError::Message)?;
    Ok(settings)
}
