//! Auto progression: moves sessions to their next question once the armed timer expires.

use std::time::Instant;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::{
    services::session_service::{self, AdvanceTrigger},
    state::SharedState,
};

/// Poll for due advances forever at the configured tick.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().progression_tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(tick = ?state.config().progression_tick, "auto progression watcher started");

    loop {
        ticker.tick().await;
        fire_due(&state, Instant::now()).await;
    }
}

/// Advance every session whose timer expired at `now`. Returns how many sessions moved.
pub async fn fire_due(state: &SharedState, now: Instant) -> usize {
    let mut advanced = 0;
    for (session_id, expected_index) in state.take_due_advances(now) {
        match session_service::advance_session(
            state,
            session_id,
            AdvanceTrigger::Timer { expected_index },
        )
        .await
        {
            Ok(_) => advanced += 1,
            Err(err) => debug!(%session_id, expected_index, error = %err, "timed advance skipped"),
        }
    }
    advanced
}
