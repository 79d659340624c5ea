use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use lgk_config::SystemSettings;
use lgk_schemas::{RewardOffer, User};
use lgk_store::{user_key, DualStore, StoreError};

use crate::error::WalletError;
use crate::mutations;

/// Persistence boundary for user-record mutations.
///
/// Exactly one logical owner per process — the current session — mutates the
/// user record, and only through this ledger. Each method clones the caller's
/// snapshot, applies the pure mutation, persists the result through the dual
/// store, and returns the updated snapshot. The caller adopts it as the new
/// in-memory state only after the method returns `Ok` — the local cache
/// write is the commit point.
pub struct WalletLedger {
    store: Arc<DualStore>,
}

impl WalletLedger {
    pub fn new(store: Arc<DualStore>) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &Arc<DualStore> {
        &self.store
    }

    /// Deduct credits for a charge the entitlement resolver approved.
    ///
    /// The balance is re-checked here: resolution and charging are separate
    /// awaits, and a concurrent reward claim or remote overwrite may have
    /// changed the snapshot in between.
    pub async fn apply_charge(&self, user: &User, amount: u32) -> Result<User, WalletError> {
        let mut updated = user.clone();
        mutations::debit(&mut updated, amount)?;
        self.persist(&updated).await?;
        info!(user_id = %updated.id, amount, balance = updated.credits, "charge applied");
        Ok(updated)
    }

    /// Merge a reward offer into the wallet. Expiry and double-claim checks
    /// belong to the reward engine; by the time an offer reaches the ledger
    /// it is a settled grant.
    pub async fn apply_reward(
        &self,
        user: &User,
        offer: &RewardOffer,
        now: DateTime<Utc>,
    ) -> Result<User, WalletError> {
        let mut updated = user.clone();
        mutations::apply_offer(&mut updated, &offer.kind, now);
        self.persist(&updated).await?;
        info!(user_id = %updated.id, offer_id = %offer.id, label = %offer.label, "reward applied");
        Ok(updated)
    }

    /// One-time signup credit grant from the settings reward table.
    pub async fn grant_signup_bonus(
        &self,
        user: &User,
        settings: &SystemSettings,
    ) -> Result<User, WalletError> {
        let mut updated = user.clone();
        mutations::credit(&mut updated, settings.signup_bonus);
        self.persist(&updated).await?;
        Ok(updated)
    }

    /// Persist an externally composed snapshot (inbox edits, spin counters,
    /// goal claims). Exists so engine code can batch several field changes
    /// into one commit instead of writing the record twice.
    pub async fn commit(&self, user: User) -> Result<User, WalletError> {
        self.persist(&user).await?;
        Ok(user)
    }

    async fn persist(&self, user: &User) -> Result<(), StoreError> {
        let value = serde_json::to_value(user)
            .map_err(|e| StoreError::Encode(format!("encode user {}: {e}", user.id)))?;
        self.store.write(&user_key(&user.id), value).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
