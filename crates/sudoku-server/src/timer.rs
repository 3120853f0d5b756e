//! Aggregation timer driver. A long-lived task shared by all sessions;
//! ticks once a second and asks the lobby controller to evaluate the
//! timer-release condition.

use std::sync::Arc;
use std::time::Duration;

use crate::lobby::Lobby;

/// Spawn the timer driver. Never returns; intended to run for the
/// lifetime of the process.
pub fn spawn(lobby: Arc<Lobby>, aggregation_window: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            lobby.maybe_fire_aggregation_timer(aggregation_window);
        }
    })
}
