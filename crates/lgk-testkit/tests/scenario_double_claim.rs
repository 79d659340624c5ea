//! Scenario: claiming a reward twice is rejected the second time.
//!
//! The claimed flag — not deletion — blocks the transition, so the inbox
//! keeps the audit trail of resolved offers.

use chrono::Duration;

use lgk_rewards::{claim_inbox_offer, queue_offer, RewardError};
use lgk_schemas::{RewardKind, RewardOffer, SubscriptionLevel};
use lgk_testkit::{fixed_now, memory_dual_store, student};
use lgk_wallet::WalletLedger;

fn coins(amount: u32) -> RewardOffer {
    RewardOffer::new(
        RewardKind::Coins { amount },
        "milestone coins",
        fixed_now() + Duration::hours(24),
    )
}

#[tokio::test]
async fn second_claim_is_rejected_and_pays_nothing() {
    let (store, _local, _remote) = memory_dual_store();
    let wallet = WalletLedger::new(store);

    let user = queue_offer(&wallet, &student("u-1", 0), coins(4), fixed_now())
        .await
        .unwrap();
    let message_id = user.inbox[0].id.clone();

    let user = claim_inbox_offer(&wallet, &user, &message_id, fixed_now())
        .await
        .unwrap();
    assert_eq!(user.credits, 4);

    let err = claim_inbox_offer(&wallet, &user, &message_id, fixed_now())
        .await
        .unwrap_err();
    assert_eq!(err, RewardError::AlreadyClaimed);
    assert_eq!(user.credits, 4, "second claim must not pay again");

    // The message survives as claimed history.
    assert_eq!(user.inbox.len(), 1);
    assert!(user.inbox[0].claimed);
}

#[tokio::test]
async fn double_claim_of_subscription_offer_does_not_extend_expiry() {
    let (store, _local, _remote) = memory_dual_store();
    let wallet = WalletLedger::new(store);

    let offer = RewardOffer::new(
        RewardKind::Subscription {
            tier: "WEEKLY".to_string(),
            level: SubscriptionLevel::Basic,
            duration_hours: 4,
        },
        "study reward",
        fixed_now() + Duration::hours(24),
    );
    let user = queue_offer(&wallet, &student("u-1", 0), offer, fixed_now())
        .await
        .unwrap();
    let message_id = user.inbox[0].id.clone();

    let claim_time = fixed_now() + Duration::minutes(10);
    let user = claim_inbox_offer(&wallet, &user, &message_id, claim_time)
        .await
        .unwrap();
    let first_expiry = user.subscription.expires_at;

    let later = claim_time + Duration::hours(1);
    let err = claim_inbox_offer(&wallet, &user, &message_id, later)
        .await
        .unwrap_err();
    assert_eq!(err, RewardError::AlreadyClaimed);
    assert_eq!(
        user.subscription.expires_at, first_expiry,
        "rejected claim must not move the expiry"
    );
}

#[tokio::test]
async fn distinct_offers_each_claim_once() {
    let (store, _local, _remote) = memory_dual_store();
    let wallet = WalletLedger::new(store);

    let user = queue_offer(&wallet, &student("u-1", 0), coins(2), fixed_now())
        .await
        .unwrap();
    let user = queue_offer(&wallet, &user, coins(4), fixed_now()).await.unwrap();

    let ids: Vec<String> = user.inbox.iter().map(|m| m.id.clone()).collect();
    let mut user = user;
    for id in &ids {
        user = claim_inbox_offer(&wallet, &user, id, fixed_now()).await.unwrap();
    }
    assert_eq!(user.credits, 6);

    for id in &ids {
        let err = claim_inbox_offer(&wallet, &user, id, fixed_now())
            .await
            .unwrap_err();
        assert_eq!(err, RewardError::AlreadyClaimed);
    }
    assert_eq!(user.credits, 6);
}
