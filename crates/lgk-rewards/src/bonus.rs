//! First-session bonus.
//!
//! Accounts younger than 24 hours that accumulate a full hour of study get
//! one short Ultra window. The grant is guarded by a permanent one-time flag
//! on the user record, so it can never repeat — not on the next tick, not on
//! a later device.

use chrono::{DateTime, Utc};
use tracing::info;

use lgk_schemas::{RewardKind, SubscriptionLevel, User};
use lgk_wallet::{apply_offer, WalletLedger};

use crate::error::RewardError;

/// Length of the granted Ultra window.
pub const FIRST_SESSION_BONUS_HOURS: u32 = 1;

const QUALIFYING_SECONDS: u32 = 3600;
const MAX_ACCOUNT_AGE_HOURS: i64 = 24;

/// Evaluate and, when eligible, grant the bonus in one commit.
///
/// Returns `Ok(None)` when nothing applies; `Ok(Some(updated))` after a
/// grant. Safe to call on every bookkeeping pass — the flag check makes it
/// idempotent.
pub async fn maybe_grant_first_session_bonus(
    wallet: &WalletLedger,
    user: &User,
    seconds_today: u32,
    now: DateTime<Utc>,
) -> Result<Option<User>, RewardError> {
    if user.first_session_bonus_granted
        || user.account_age_hours(now) >= MAX_ACCOUNT_AGE_HOURS
        || seconds_today < QUALIFYING_SECONDS
    {
        return Ok(None);
    }

    let mut updated = user.clone();
    apply_offer(
        &mut updated,
        &RewardKind::Subscription {
            tier: "MONTHLY".to_string(),
            level: SubscriptionLevel::Ultra,
            duration_hours: FIRST_SESSION_BONUS_HOURS,
        },
        now,
    );
    updated.first_session_bonus_granted = true;
    let updated = wallet.commit(updated).await?;
    info!(user_id = %updated.id, "first-session bonus granted");
    Ok(Some(updated))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
