//! The session's single authoritative timer loop.
//!
//! One task drives every cadence — per-second milestone ticks, the
//! ten-second liveness beacon, and the sixty-second bookkeeping pass — and
//! reads current state by lookup through the context on every tick, never
//! through closure-captured copies. That rules out the stale-counter class
//! of bugs where an old snapshot keeps firing thresholds that already
//! resolved.
//!
//! The liveness beacon and the reward counter are disjoint state (a
//! remote-only key vs. the activity record), so their cadences never
//! conflict.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use lgk_rewards::maybe_grant_first_session_bonus;
use lgk_store::user_liveness_key;

use crate::context::SessionContext;

const LIVENESS_EVERY_TICKS: u64 = 10;
const BOOKKEEPING_EVERY_TICKS: u64 = 60;

/// Owner handle for the timer loop; stopped on logout.
pub(crate) struct TimerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub(crate) fn stop(&self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

pub(crate) fn spawn_session_timer(ctx: Arc<SessionContext>) -> TimerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick completes immediately; skip it so tick 1
        // lands a full second after session start.
        ticker.tick().await;

        let mut tick: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }
            tick += 1;
            run_tick(&ctx, tick).await;
        }
    });

    TimerHandle {
        shutdown: shutdown_tx,
        task,
    }
}

/// One tick of session time. Public within the crate so tests can drive the
/// loop deterministically without waiting on wall-clock seconds.
pub(crate) async fn run_tick(ctx: &SessionContext, tick: u64) {
    let now = Utc::now();

    // 1s: milestone accumulation.
    let fired = {
        let mut engine = ctx.engine.lock().await;
        engine.on_tick(now).await
    };
    match fired {
        Ok(Some(offer)) => {
            // Surface the offer: persist it on the pending queue, then
            // notify whatever modal surface is listening.
            let user = ctx.user().await;
            let mut updated = user.clone();
            updated.pending_rewards.push(offer.clone());
            match ctx.wallet.commit(updated).await {
                Ok(committed) => {
                    ctx.adopt_user(committed).await;
                    let _ = ctx.offers_tx.send(offer);
                }
                Err(err) => warn!(error = %err, "failed to persist pending offer"),
            }
        }
        Ok(None) => {}
        Err(err) => warn!(error = %err, "milestone tick failed"),
    }

    // 10s: liveness beacon (remote-only, fire-and-forget).
    if tick % LIVENESS_EVERY_TICKS == 0 {
        let (user_id, seconds) = {
            let user = ctx.user.read().await;
            (user.id.clone(), ctx.engine.lock().await.seconds_today())
        };
        ctx.store.push_remote(
            &user_liveness_key(&user_id),
            json!({ "last_active": now, "seconds_today": seconds }),
        );
    }

    // 60s: publish the day snapshot for other devices / tomorrow's
    // lookback, and evaluate the first-session bonus.
    if tick % BOOKKEEPING_EVERY_TICKS == 0 {
        if let Err(err) = ctx.engine.lock().await.publish().await {
            warn!(error = %err, "day-progress publish failed");
        }

        let user = ctx.user().await;
        let seconds = ctx.engine.lock().await.seconds_today();
        match maybe_grant_first_session_bonus(&ctx.wallet, &user, seconds, now).await {
            Ok(Some(updated)) => ctx.adopt_user(updated).await,
            Ok(None) => {}
            Err(err) => warn!(error = %err, "first-session bonus evaluation failed"),
        }
    }
}
