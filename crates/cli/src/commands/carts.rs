//! One-off expired cart sweep.
//!
//! The server sweeps on a timer; this is for deployments that run with the
//! timer disabled (`CARTLINE_CART_REAP_INTERVAL_SECS=0`) and schedule it
//! externally instead.

use std::sync::Arc;

use cartline_server::services::{CartService, DEFAULT_CART_TTL_HOURS, SystemClock};
use chrono::Duration;

use super::{CliError, repositories};

/// Delete every cart whose expiry has passed.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn reap() -> Result<u64, CliError> {
    let repos = repositories().await?;
    let carts = CartService::new(
        Arc::clone(&repos.carts),
        Arc::clone(&repos.products),
        Arc::new(SystemClock),
        Duration::hours(DEFAULT_CART_TTL_HOURS),
    );

    let removed = carts.reap_expired().await?;
    tracing::info!(removed, "Expired carts deleted");

    repos.close().await;
    Ok(removed)
}
