//! Subcommand implementations.
//!
//! Every command talks to `PostgreSQL` directly; the URL comes from
//! `CARTLINE_DATABASE_URL` (or `DATABASE_URL`), loaded from `.env` if present.

pub mod admin;
pub mod carts;
pub mod migrate;
pub mod seed;

use cartline_server::db::{self, Repositories};
use cartline_server::services::{AuthError, CommerceError};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors a CLI command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    SeedFormat(#[from] serde_yaml::Error),

    /// One or more seed entries failed validation.
    #[error("{0} invalid product(s) in seed file")]
    SeedInvalid(usize),

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Connect to the database named by the environment.
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` when no URL is set, or
/// `CliError::Database` if the connection fails.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("CARTLINE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("CARTLINE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Repositories over a fresh connection.
///
/// # Errors
///
/// See [`connect`].
pub async fn repositories() -> Result<Repositories, CliError> {
    Ok(Repositories::postgres(connect().await?))
}
