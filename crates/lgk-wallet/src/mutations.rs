//! Raw wallet mechanics: pure, deterministic merges over a user snapshot.
//!
//! Nothing here persists or reads a clock; `now` is an input. The ledger
//! owns the persistence boundary and is the only production caller.

use chrono::{DateTime, Duration, Utc};

use lgk_schemas::{RewardKind, User};

use crate::error::WalletError;

/// Deduct `amount` credits. Fails — without mutating — when the balance is
/// insufficient; never clamps to zero.
pub fn debit(user: &mut User, amount: u32) -> Result<(), WalletError> {
    if amount > user.credits {
        return Err(WalletError::InsufficientCredits {
            required: amount,
            available: user.credits,
        });
    }
    user.credits -= amount;
    Ok(())
}

/// Add `amount` credits (saturating; a balance near `u32::MAX` is already
/// nonsense, but it must not wrap into a small number).
pub fn credit(user: &mut User, amount: u32) {
    user.credits = user.credits.saturating_add(amount);
}

/// Merge a reward grant into the snapshot.
///
/// Coins add to the balance. Subscriptions replace the descriptor with
/// expiry `now + duration_hours` and set `granted_by_admin`, so a reward
/// grant stays distinguishable from a paid purchase (spin limits and
/// milestone lookback check exactly that flag).
pub fn apply_offer(user: &mut User, kind: &RewardKind, now: DateTime<Utc>) {
    match kind {
        RewardKind::Coins { amount } => credit(user, *amount),
        RewardKind::Subscription {
            tier,
            level,
            duration_hours,
        } => {
            user.subscription.tier = Some(tier.clone());
            user.subscription.level = *level;
            user.subscription.expires_at = Some(now + Duration::hours(*duration_hours as i64));
            user.subscription.is_premium = true;
            user.subscription.granted_by_admin = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgk_schemas::SubscriptionLevel;

    fn now() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    fn user_with(credits: u32) -> User {
        let mut user = User::new_student("u-1", "Asha", now());
        user.credits = credits;
        user
    }

    #[test]
    fn debit_within_balance_succeeds() {
        let mut user = user_with(5);
        debit(&mut user, 5).unwrap();
        assert_eq!(user.credits, 0);
    }

    #[test]
    fn debit_beyond_balance_fails_without_mutation() {
        let mut user = user_with(4);
        let err = debit(&mut user, 5).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientCredits {
                required: 5,
                available: 4
            }
        );
        assert_eq!(user.credits, 4, "failed debit must not clamp");
    }

    #[test]
    fn credit_saturates_instead_of_wrapping() {
        let mut user = user_with(u32::MAX - 1);
        credit(&mut user, 10);
        assert_eq!(user.credits, u32::MAX);
    }

    #[test]
    fn coins_offer_adds_to_balance() {
        let mut user = user_with(3);
        apply_offer(&mut user, &RewardKind::Coins { amount: 2 }, now());
        assert_eq!(user.credits, 5);
    }

    #[test]
    fn subscription_offer_sets_descriptor_and_grant_flag() {
        let mut user = user_with(0);
        apply_offer(
            &mut user,
            &RewardKind::Subscription {
                tier: "WEEKLY".to_string(),
                level: SubscriptionLevel::Basic,
                duration_hours: 4,
            },
            now(),
        );
        assert!(user.subscription.is_premium);
        assert!(user.subscription.granted_by_admin);
        assert_eq!(user.subscription.level, SubscriptionLevel::Basic);
        assert_eq!(
            user.subscription.expires_at,
            Some(now() + Duration::hours(4))
        );
        assert!(user.subscription.is_active(now()));
        assert!(!user.subscription.is_active_paid(now()));
    }
}
