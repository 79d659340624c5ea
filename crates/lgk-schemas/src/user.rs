use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reward::{InboxMessage, RewardOffer};

// ---------------------------------------------------------------------------
// Role / subscription level
// ---------------------------------------------------------------------------

/// Account role. Admins bypass all entitlement charges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// Subscription level gates which content types are unlocked without a
/// per-item charge. `Ultra` unlocks everything; `Basic` unlocks a fixed
/// subset (see lgk-entitlement).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionLevel {
    #[default]
    Basic,
    Ultra,
}

impl SubscriptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionLevel::Basic => "BASIC",
            SubscriptionLevel::Ultra => "ULTRA",
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription descriptor
// ---------------------------------------------------------------------------

/// Time-boxed entitlement attached to a user.
///
/// Flags may linger after expiry (records are whole-snapshot last-write-wins,
/// nothing garbage-collects them); [`Subscription::is_active`] is therefore
/// the only sanctioned way to ask whether a subscription currently counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Plan tier label (e.g. `"WEEKLY"`, `"MONTHLY"`, `"LIFETIME"`).
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub level: SubscriptionLevel,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_premium: bool,
    /// `true` when the subscription was granted (reward, admin push) rather
    /// than purchased. Reward grants use the free-tier spin limits and do not
    /// suppress milestone lookback.
    #[serde(default)]
    pub granted_by_admin: bool,
}

impl Subscription {
    /// Active iff the premium flag is set **and** the expiry lies in the
    /// future. An expired subscription is treated as absent even when the
    /// flags remain set.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.expires_at.map(|e| e > now).unwrap_or(false)
    }

    /// Active and purchased (not a reward/admin grant).
    pub fn is_active_paid(&self, now: DateTime<Utc>) -> bool {
        self.is_active(now) && !self.granted_by_admin
    }
}

// ---------------------------------------------------------------------------
// Daily spin counter
// ---------------------------------------------------------------------------

/// Date-keyed spin usage. The count only applies to `date`; any other day
/// reads as zero used spins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinCounter {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub count: u32,
}

impl SpinCounter {
    /// Spins already used on `today` (0 when the counter belongs to another day).
    pub fn used_on(&self, today: NaiveDate) -> u32 {
        if self.date == Some(today) {
            self.count
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Whole-snapshot user record.
///
/// The record is exclusively owned by the current session and persisted as a
/// complete replacement through the dual store — never patched field-wise.
/// Every non-identity field carries `#[serde(default)]` so snapshots written
/// by older builds decode without rejection; genuinely unknown keys are
/// captured in `extensions` and round-trip untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    /// Spendable credit balance. Non-negative by construction; all debits go
    /// through the wallet ledger, which fails rather than clamps.
    #[serde(default)]
    pub credits: u32,
    #[serde(default)]
    pub subscription: Subscription,
    #[serde(default)]
    pub spin: SpinCounter,
    /// Day of the most recent daily-goal claim; guards one claim per day.
    #[serde(default)]
    pub last_reward_claim_date: Option<NaiveDate>,
    /// Offers produced but not yet resolved. Append-only until drained.
    #[serde(default)]
    pub pending_rewards: Vec<RewardOffer>,
    /// Delayed reward offers and admin messages. Claimed entries are flagged,
    /// never deleted, so the claim history survives.
    #[serde(default)]
    pub inbox: Vec<InboxMessage>,
    pub created_at: DateTime<Utc>,
    /// Locked accounts are refused at session start.
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub redeemed_codes: Vec<String>,
    /// One-time first-session bonus marker. Set permanently on grant.
    #[serde(default)]
    pub first_session_bonus_granted: bool,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    /// Unrecognized fields from newer/older snapshot versions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl User {
    /// Minimal student account; used by signup flows and tests.
    pub fn new_student(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: Role::Student,
            credits: 0,
            subscription: Subscription::default(),
            spin: SpinCounter::default(),
            last_reward_claim_date: None,
            pending_rewards: Vec::new(),
            inbox: Vec::new(),
            created_at: now,
            is_locked: false,
            redeemed_codes: Vec::new(),
            first_session_bonus_granted: false,
            last_active: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Account age in whole hours at `now` (0 when the clock ran backwards).
    pub fn account_age_hours(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_hours().max(0)
    }

    /// Unread inbox messages.
    pub fn unread_count(&self) -> usize {
        self.inbox.iter().filter(|m| !m.read).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn expired_subscription_is_not_active() {
        let sub = Subscription {
            tier: Some("WEEKLY".to_string()),
            level: SubscriptionLevel::Basic,
            expires_at: Some(now() - Duration::hours(1)),
            is_premium: true,
            granted_by_admin: false,
        };
        assert!(!sub.is_active(now()));
    }

    #[test]
    fn premium_flag_alone_is_not_active() {
        let sub = Subscription {
            is_premium: true,
            expires_at: None,
            ..Subscription::default()
        };
        assert!(!sub.is_active(now()));
    }

    #[test]
    fn future_expiry_is_active() {
        let sub = Subscription {
            expires_at: Some(now() + Duration::hours(4)),
            is_premium: true,
            ..Subscription::default()
        };
        assert!(sub.is_active(now()));
        assert!(sub.is_active_paid(now()));
    }

    #[test]
    fn granted_subscription_is_not_paid() {
        let sub = Subscription {
            expires_at: Some(now() + Duration::hours(4)),
            is_premium: true,
            granted_by_admin: true,
            ..Subscription::default()
        };
        assert!(sub.is_active(now()));
        assert!(!sub.is_active_paid(now()));
    }

    #[test]
    fn spin_counter_resets_on_other_day() {
        let counter = SpinCounter {
            date: Some("2026-02-28".parse().unwrap()),
            count: 5,
        };
        assert_eq!(counter.used_on("2026-02-28".parse().unwrap()), 5);
        assert_eq!(counter.used_on("2026-03-01".parse().unwrap()), 0);
    }

    #[test]
    fn user_decodes_with_missing_optional_fields() {
        // A snapshot written by an older build: only identity + created_at.
        let raw = serde_json::json!({
            "id": "u-1",
            "name": "Asha",
            "created_at": "2026-01-01T00:00:00Z"
        });
        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.credits, 0);
        assert_eq!(user.role, Role::Student);
        assert!(user.inbox.is_empty());
        assert!(!user.is_locked);
    }

    #[test]
    fn unknown_fields_round_trip_through_extensions() {
        let raw = serde_json::json!({
            "id": "u-1",
            "name": "Asha",
            "created_at": "2026-01-01T00:00:00Z",
            "legacy_streak": 7
        });
        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.extensions.get("legacy_streak"), Some(&serde_json::json!(7)));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back.get("legacy_streak"), Some(&serde_json::json!(7)));
    }
}
