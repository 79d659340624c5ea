//! Test-participation reward.
//!
//! Starting a test persists an attempt-start timestamp (so a reload resumes
//! the same attempt instead of resetting the clock). Completing it records
//! the attempt through the dual store — the remote copy is what admin flows
//! read — grants a 24-hour subscription window, and clears the start key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use lgk_schemas::{RewardKind, User};
use lgk_store::{test_attempt_start_key, test_result_key, DualStore};
use lgk_wallet::{apply_offer, WalletLedger};

use crate::error::RewardError;

/// Length of the participation grant.
pub const PARTICIPATION_REWARD_HOURS: u32 = 24;

/// A submitted test attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestAttempt {
    pub test_id: String,
    pub test_name: String,
    pub user_id: String,
    pub user_name: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    /// Rounded percentage score.
    pub score_percent: u32,
    pub total_questions: u32,
}

/// Begin (or resume) a test attempt. Returns the attempt's start time: the
/// persisted one when a previous session already started this test,
/// otherwise `now`, which is persisted to the local cache.
pub async fn begin_test_attempt(
    store: &DualStore,
    user_id: &str,
    test_id: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, RewardError> {
    let key = test_attempt_start_key(user_id, test_id);
    if let Some(raw) = store.read(&key).await? {
        if let Ok(existing) = serde_json::from_value::<DateTime<Utc>>(raw) {
            return Ok(existing);
        }
    }
    store.write_local(&key, json!(now)).await?;
    Ok(now)
}

/// Submit a completed test: record the attempt, grant the participation
/// window, clear the start key. Returns the updated user and the attempt.
pub async fn complete_test_attempt(
    store: &DualStore,
    wallet: &WalletLedger,
    user: &User,
    test_id: &str,
    test_name: &str,
    score: u32,
    total: u32,
    now: DateTime<Utc>,
) -> Result<(User, TestAttempt), RewardError> {
    let start_key = test_attempt_start_key(&user.id, test_id);
    let started_at = match store.read(&start_key).await? {
        Some(raw) => serde_json::from_value(raw).unwrap_or(now),
        None => now,
    };

    let attempt = TestAttempt {
        test_id: test_id.to_string(),
        test_name: test_name.to_string(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        started_at,
        submitted_at: now,
        score_percent: score_percent(score, total),
        total_questions: total,
    };
    let encoded = serde_json::to_value(&attempt)
        .map_err(|e| lgk_store::StoreError::Encode(format!("encode test attempt: {e}")))?;
    store
        .write(
            &test_result_key(&user.id, test_id, now.timestamp_millis()),
            encoded,
        )
        .await?;

    // Participation reward: a 24h window at the user's current level.
    let mut updated = user.clone();
    let current_level = updated.subscription.level;
    apply_offer(
        &mut updated,
        &RewardKind::Subscription {
            tier: "WEEKLY".to_string(),
            level: current_level,
            duration_hours: PARTICIPATION_REWARD_HOURS,
        },
        now,
    );
    let updated = wallet.commit(updated).await?;

    store.remove(&start_key).await?;
    info!(
        user_id = %updated.id,
        test_id,
        score_percent = attempt.score_percent,
        "test submitted; participation window granted"
    );
    Ok((updated, attempt))
}

fn score_percent(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (score.saturating_mul(100) + total / 2) / total
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
