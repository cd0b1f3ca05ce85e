//! Periodic liveness pings.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Spawn a heartbeat that calls `tick` every `period`, starting one period
/// from now.
///
/// `tick` returns `false` to stop the heartbeat. A zero period disables the
/// heartbeat and returns `None`.
pub(crate) fn spawn<F>(period: Duration, mut tick: F) -> Option<JoinHandle<()>>
where
    F: FnMut() -> bool + Send + 'static,
{
    if period.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !tick() {
                break;
            }
        }
    }))
}
