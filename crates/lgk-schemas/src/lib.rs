//! lgk-schemas
//!
//! Shared typed records for the LearnGate kernel:
//! - User account snapshot (credits, subscription, spin counters, inbox)
//! - Content descriptors and the composite catalog key
//! - Catalog records (admin-curated or AI-generated payloads + prices)
//! - Reward offers, inbox messages, redeem codes
//! - Purchase options surfaced to the payment handoff
//!
//! Everything here is plain data: serde round-trippable, no IO, no time
//! lookups (callers pass `now` explicitly where a clock is needed).

mod content;
mod reward;
mod user;

pub use content::{CatalogRecord, ContentKey, ContentType, VideoItem};
pub use reward::{
    CreditPackage, InboxMessage, RedeemCode, RewardKind, RewardOffer, SubscriptionPlan,
};
pub use user::{Role, SpinCounter, Subscription, SubscriptionLevel, User};
