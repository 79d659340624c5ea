//! Spin-wheel settlement.
//!
//! The wheel itself is presentation; this module owns the rules: a daily
//! spin allowance by subscription tier (reward-granted subscriptions count
//! as free tier), an optional per-spin credit cost, a weighted prize pick,
//! and the single-commit settlement of cost, winnings, and the date-keyed
//! counter. The engine stays deterministic — the caller supplies the random
//! roll.

use chrono::{DateTime, Utc};
use tracing::info;

use lgk_config::SystemSettings;
use lgk_schemas::{SubscriptionLevel, User};
use lgk_wallet::{credit, debit, WalletLedger};

use crate::error::RewardError;

/// Daily spin allowance for this user.
///
/// Reward-granted subscriptions (`granted_by_admin`) use the free limit;
/// only paid subscribers get the raised allowances.
pub fn spin_limit(user: &User, settings: &SystemSettings, now: DateTime<Utc>) -> u32 {
    if !user.subscription.is_active(now) || user.subscription.granted_by_admin {
        return settings.spin_limit_free;
    }
    match user.subscription.level {
        SubscriptionLevel::Ultra => settings.spin_limit_ultra,
        SubscriptionLevel::Basic => settings.spin_limit_basic,
    }
}

/// Spins left today.
pub fn spins_remaining(user: &User, settings: &SystemSettings, now: DateTime<Utc>) -> u32 {
    let limit = spin_limit(user, settings, now);
    limit.saturating_sub(user.spin.used_on(now.date_naive()))
}

/// Weighted prize pick: each wheel value `v` carries weight `10000/(v+1)`,
/// so small prizes dominate and 0 is the most common outcome. `roll` must
/// be in `[0, 1)`; out-of-range rolls clamp to the edges. An empty wheel
/// pays 0.
pub fn pick_prize(wheel: &[u32], roll: f64) -> u32 {
    if wheel.is_empty() {
        return 0;
    }
    let weights: Vec<u64> = wheel.iter().map(|v| 10_000 / (*v as u64 + 1)).collect();
    let total: u64 = weights.iter().sum();
    let roll = roll.clamp(0.0, 1.0 - f64::EPSILON);
    let mut target = (roll * total as f64) as u64;
    for (value, weight) in wheel.iter().zip(weights.iter()) {
        if target < *weight {
            return *value;
        }
        target -= weight;
    }
    // Floating-point edge: fall back to the last segment.
    *wheel.last().unwrap_or(&0)
}

/// Settle one spin: enforce the daily limit, charge the spin cost, credit
/// the prize, and advance the date-keyed counter — all in one commit.
/// Returns the updated user and the amount won.
pub async fn settle_spin(
    wallet: &WalletLedger,
    user: &User,
    settings: &SystemSettings,
    now: DateTime<Utc>,
    roll: f64,
) -> Result<(User, u32), RewardError> {
    let today = now.date_naive();
    let limit = spin_limit(user, settings, now);
    let used = user.spin.used_on(today);
    if used >= limit {
        return Err(RewardError::SpinLimitReached { used, limit });
    }

    let mut updated = user.clone();
    debit(&mut updated, settings.spin_cost).map_err(RewardError::Wallet)?;
    let won = pick_prize(&settings.wheel_rewards, roll);
    credit(&mut updated, won);
    updated.spin.date = Some(today);
    updated.spin.count = used + 1;
    let updated = wallet.commit(updated).await?;

    info!(user_id = %updated.id, won, spin = updated.spin.count, "spin settled");
    Ok((updated, won))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
