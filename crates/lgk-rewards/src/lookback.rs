//! Next-day lookback.
//!
//! The live milestone loop only fires while the app is open; a user who
//! closed it before a threshold produced its offer would otherwise lose the
//! reward. At session start this pass inspects yesterday's persisted
//! activity seconds and, when a subscription threshold was met, synthesizes
//! a deferred offer into the inbox. A per-day marker key makes the pass
//! idempotent across restarts.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use lgk_schemas::{InboxMessage, RewardKind, RewardOffer, SubscriptionLevel, User};
use lgk_store::{activity_key, lookback_marker_key, DualStore};
use lgk_wallet::WalletLedger;

use crate::error::RewardError;
use crate::milestones::{DayProgress, OFFER_TTL_HOURS};

/// Yesterday's ladder: three hours earns the Ultra window, one hour the
/// Basic one. Evaluated top-down, best reward wins.
const LOOKBACK_LADDER: [(u32, &str, SubscriptionLevel, u32, &str); 2] = [
    (
        10_800,
        "MONTHLY",
        SubscriptionLevel::Ultra,
        4,
        "You studied 3+ hours yesterday: 4 hours of Ultra access",
    ),
    (
        3_600,
        "WEEKLY",
        SubscriptionLevel::Basic,
        4,
        "You studied 1+ hour yesterday: 4 hours of Basic access",
    ),
];

/// Run the lookback for the session's user. Returns the updated snapshot
/// when a deferred offer was queued, `None` otherwise.
///
/// Skipped entirely for users holding an active *paid* subscription —
/// they already have the access the reward would grant; reward-granted
/// windows do not suppress it.
pub async fn run_next_day_lookback(
    store: &DualStore,
    wallet: &WalletLedger,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Option<User>, RewardError> {
    let today = now.date_naive();
    let Some(yesterday) = today.pred_opt() else {
        return Ok(None);
    };

    if user.subscription.is_active_paid(now) {
        return Ok(None);
    }

    let marker_key = lookback_marker_key(&user.id, yesterday);
    if store.read(&marker_key).await?.is_some() {
        return Ok(None);
    }

    let seconds = match store.read(&activity_key(&user.id, yesterday)).await? {
        Some(raw) => serde_json::from_value::<DayProgress>(raw)
            .map(|p| p.seconds)
            .unwrap_or(0),
        None => 0,
    };

    let Some((_, tier, level, hours, text)) = LOOKBACK_LADDER
        .iter()
        .find(|(threshold, ..)| seconds >= *threshold)
        .copied()
    else {
        return Ok(None);
    };

    let offer = RewardOffer::new(
        RewardKind::Subscription {
            tier: tier.to_string(),
            level,
            duration_hours: hours,
        },
        text,
        now + Duration::hours(OFFER_TTL_HOURS),
    );
    let mut updated = user.clone();
    updated
        .inbox
        .insert(0, InboxMessage::from_offer(text, offer, now));
    let updated = wallet.commit(updated).await?;
    store.write(&marker_key, json!(true)).await?;

    info!(user_id = %updated.id, seconds, level = level.as_str(), "deferred lookback offer queued");
    Ok(Some(updated))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
