//! Background sweep of expired carts.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cart::CartService;

/// Spawn a task that deletes expired carts every `period`.
///
/// The first sweep runs one full period after startup. Failures are logged
/// and retried on the next tick. Abort the handle to stop the task.
pub fn spawn_cart_reaper(carts: CartService, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "Spawning cart reaper task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match carts.reap_expired().await {
                Ok(0) => debug!("no expired carts"),
                Ok(removed) => info!(removed, "reaped expired carts"),
                Err(e) => warn!(error = %e, "cart reap failed"),
            }
        }
    })
}
