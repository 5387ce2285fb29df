//! Ordered, additive schema migrations applied once at startup.
use anyhow::Context;
use sqlx::{PgPool, Row};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// Append only. Never edit a migration that has shipped.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                username VARCHAR(50) UNIQUE NOT NULL,
                email VARCHAR(100) UNIQUE,
                password_hash VARCHAR(255) NOT NULL CHECK (password_hash <> ''),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
        "#],
    },
    Migration {
        version: 2,
        name: "create_password_resets",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS password_resets (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token VARCHAR(128) UNIQUE NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                used BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS password_resets_user_id_idx ON password_resets (user_id)",
        ],
    },
    Migration {
        version: 3,
        name: "add_profile_columns",
        statements: &[
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS full_name VARCHAR(100)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS phone VARCHAR(30)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS gender VARCHAR(20)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS date_of_birth VARCHAR(20)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS address VARCHAR(255)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS ward VARCHAR(100)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS district VARCHAR(100)",
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS city VARCHAR(100)",
        ],
    },
];

// Arbitrary key shared by every instance so only one applies migrations at a time.
const MIGRATION_LOCK_KEY: i64 = 0x6163_636f_756e_7473;

#[tracing::instrument(name = "Run database migrations", skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create the schema_migrations table.")?;

    for migration in MIGRATIONS {
        let mut transaction = pool
            .begin()
            .await
            .context("Failed to begin migration transaction.")?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *transaction)
            .await
            .context("Failed to take the migration lock.")?;

        let applied: bool = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = $1) AS applied",
        )
        .bind(migration.version)
        .fetch_one(&mut *transaction)
        .await
        .context("Failed to read applied migrations.")?
        .get("applied");
        if applied {
            continue;
        }

        for statement in migration.statements {
            sqlx::query(*statement)
                .execute(&mut *transaction)
                .await
                .with_context(|| {
                    format!(
                        "Migration {} ({}) failed.",
                        migration.version, migration.name
                    )
                })?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *transaction)
            .await
            .context("Failed to record applied migration.")?;

        transaction
            .commit()
            .await
            .context("Failed to commit migration.")?;
        tracing::info!(version = migration.version, name = migration.name, "Applied migration");
    }

    Ok(())
}
