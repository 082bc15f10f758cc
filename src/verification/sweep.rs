//! Periodic purge of expired verification tokens.
//! Used by: main.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::verification::TokenStore;

pub fn spawn_sweeper(store: Arc<dyn TokenStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "expired verification tokens purged"),
                Err(e) => tracing::warn!(error = %e, "verification token sweep failed"),
            }
        }
    })
}
