//! Daily personal-goal reward.
//!
//! The user configures a goal in hours. Once today's accumulated seconds
//! reach it and no goal reward was claimed yet today, a flat credit reward
//! (settings `daily_reward`) becomes claimable exactly once; claiming
//! stamps `last_reward_claim_date = today`, which is the idempotence guard.

use chrono::NaiveDate;
use tracing::info;

use lgk_config::SystemSettings;
use lgk_schemas::User;
use lgk_wallet::{credit, WalletLedger};

use crate::error::RewardError;

/// Whether today's accumulated seconds satisfy a goal of `goal_hours`.
pub fn goal_met(seconds_today: u32, goal_hours: u32) -> bool {
    goal_hours > 0 && seconds_today >= goal_hours.saturating_mul(3600)
}

/// Goal met and not yet claimed today.
pub fn can_claim_daily_goal(
    user: &User,
    seconds_today: u32,
    goal_hours: u32,
    today: NaiveDate,
) -> bool {
    goal_met(seconds_today, goal_hours) && user.last_reward_claim_date != Some(today)
}

/// Claim the daily-goal reward. Fails with [`RewardError::GoalNotMet`] or
/// [`RewardError::AlreadyClaimedToday`] without mutating anything.
pub async fn claim_daily_goal(
    wallet: &WalletLedger,
    user: &User,
    seconds_today: u32,
    goal_hours: u32,
    settings: &SystemSettings,
    today: NaiveDate,
) -> Result<User, RewardError> {
    if !goal_met(seconds_today, goal_hours) {
        return Err(RewardError::GoalNotMet);
    }
    if user.last_reward_claim_date == Some(today) {
        return Err(RewardError::AlreadyClaimedToday);
    }

    let mut updated = user.clone();
    credit(&mut updated, settings.daily_reward);
    updated.last_reward_claim_date = Some(today);
    let updated = wallet.commit(updated).await?;
    info!(user_id = %updated.id, amount = settings.daily_reward, "daily goal reward claimed");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use lgk_store::{DualStore, MemoryStore};

    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-01T20:00:00Z".parse().unwrap()
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    fn wallet() -> WalletLedger {
        WalletLedger::new(Arc::new(DualStore::new(
            Arc::new(MemoryStore::new("local")),
            Arc::new(MemoryStore::new("remote")),
        )))
    }

    fn student() -> User {
        User::new_student("u-1", "Asha", now())
    }

    #[test]
    fn goal_boundaries() {
        assert!(!goal_met(3 * 3600 - 1, 3));
        assert!(goal_met(3 * 3600, 3));
        assert!(!goal_met(u32::MAX, 0), "zero-hour goal never counts as met");
    }

    #[tokio::test]
    async fn claim_pays_settings_amount_and_stamps_the_day() {
        let wallet = wallet();
        let settings = SystemSettings::default();
        let user = student();

        let updated = claim_daily_goal(&wallet, &user, 3 * 3600, 3, &settings, today())
            .await
            .unwrap();
        assert_eq!(updated.credits, settings.daily_reward);
        assert_eq!(updated.last_reward_claim_date, Some(today()));
    }

    #[tokio::test]
    async fn second_claim_same_day_is_rejected() {
        let wallet = wallet();
        let settings = SystemSettings::default();
        let user = student();

        let user = claim_daily_goal(&wallet, &user, 3 * 3600, 3, &settings, today())
            .await
            .unwrap();
        let err = claim_daily_goal(&wallet, &user, 4 * 3600, 3, &settings, today())
            .await
            .unwrap_err();
        assert_eq!(err, RewardError::AlreadyClaimedToday);
        assert_eq!(user.credits, settings.daily_reward);
    }

    #[tokio::test]
    async fn next_day_is_claimable_again() {
        let wallet = wallet();
        let settings = SystemSettings::default();
        let mut user = student();
        user.last_reward_claim_date = Some(today());

        let tomorrow = today().succ_opt().unwrap();
        assert!(can_claim_daily_goal(&user, 3 * 3600, 3, tomorrow));
        let updated = claim_daily_goal(&wallet, &user, 3 * 3600, 3, &settings, tomorrow)
            .await
            .unwrap();
        assert_eq!(updated.last_reward_claim_date, Some(tomorrow));
    }

    #[tokio::test]
    async fn unmet_goal_is_rejected() {
        let wallet = wallet();
        let settings = SystemSettings::default();
        let user = student();
        let err = claim_daily_goal(&wallet, &user, 100, 3, &settings, today())
            .await
            .unwrap_err();
        assert_eq!(err, RewardError::GoalNotMet);
    }
}
