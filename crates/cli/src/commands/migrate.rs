//! Database migration command.
//!
//! ```bash
//! cartline-cli migrate
//! ```
//!
//! Applies `crates/server/migrations/` in order. Already-applied migrations
//! are skipped, so running it twice is harmless.

use super::{CliError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    pool.close().await;
    Ok(())
}
