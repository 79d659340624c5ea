use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::SubscriptionLevel;

// ---------------------------------------------------------------------------
// Reward offers
// ---------------------------------------------------------------------------

/// What an offer grants when claimed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardKind {
    Coins {
        amount: u32,
    },
    Subscription {
        tier: String,
        level: SubscriptionLevel,
        duration_hours: u32,
    },
}

/// An unclaimed grant awaiting a user decision.
///
/// Lifecycle: produced by the milestone engine or a participation event,
/// then either claimed (merged into the wallet), queued into the inbox for a
/// later decision, or expired (past `expires_at`, never merged). Claimed
/// offers are flagged, not deleted, wherever they are stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardOffer {
    pub id: String,
    #[serde(flatten)]
    pub kind: RewardKind,
    pub label: String,
    pub expires_at: DateTime<Utc>,
}

impl RewardOffer {
    pub fn new(kind: RewardKind, label: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// A delayed reward offer or plain admin message delivered to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    /// Once set, the carried offer can never be claimed again.
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub offer: Option<RewardOffer>,
}

impl InboxMessage {
    /// Wrap an offer for delayed claiming.
    pub fn from_offer(text: impl Into<String>, offer: RewardOffer, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sent_at,
            read: false,
            claimed: false,
            offer: Some(offer),
        }
    }
}

// ---------------------------------------------------------------------------
// Redeem codes
// ---------------------------------------------------------------------------

/// Admin-issued one-shot credit grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemCode {
    pub code: String,
    pub amount: u32,
    #[serde(default)]
    pub is_redeemed: bool,
    #[serde(default)]
    pub redeemed_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Purchase options (payment handoff inputs)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPackage {
    pub id: String,
    pub name: String,
    /// Price in the external currency unit; opaque to the core.
    pub price: u32,
    pub credits: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub duration: String,
    pub basic_price: u32,
    pub ultra_price: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub popular: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
