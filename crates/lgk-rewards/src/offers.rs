//! Claim/ignore workflow for produced offers.
//!
//! A live offer surfaced to the user resolves one of three ways: claimed
//! now (wallet merge), queued to the inbox for later, or expired. Inbox
//! offers keep their own expiry and flip to `claimed` on merge — the flag,
//! not deletion, is what blocks a second claim.

use chrono::{DateTime, Utc};
use tracing::info;

use lgk_schemas::{InboxMessage, RewardOffer, User};
use lgk_wallet::{apply_offer, WalletLedger};

use crate::error::RewardError;

/// Claim a live offer immediately.
pub async fn claim_offer(
    wallet: &WalletLedger,
    user: &User,
    offer: &RewardOffer,
    now: DateTime<Utc>,
) -> Result<User, RewardError> {
    if offer.is_expired(now) {
        return Err(RewardError::OfferExpired);
    }
    let updated = wallet.apply_reward(user, offer, now).await?;
    Ok(updated)
}

/// Ignore a live offer: queue it into the inbox for a later decision. The
/// offer stays subject to its own expiry.
pub async fn queue_offer(
    wallet: &WalletLedger,
    user: &User,
    offer: RewardOffer,
    now: DateTime<Utc>,
) -> Result<User, RewardError> {
    let mut updated = user.clone();
    let text = offer.label.clone();
    updated
        .inbox
        .insert(0, InboxMessage::from_offer(text, offer, now));
    let updated = wallet.commit(updated).await?;
    Ok(updated)
}

/// Claim the offer carried by inbox message `message_id`.
///
/// Rejected when the message is unknown, carries no offer, was already
/// claimed, or the offer expired. The reward merge and the claimed/read
/// flags land in one commit, so a crash cannot leave a claimed-but-unpaid
/// (or paid-but-unclaimed) message behind.
pub async fn claim_inbox_offer(
    wallet: &WalletLedger,
    user: &User,
    message_id: &str,
    now: DateTime<Utc>,
) -> Result<User, RewardError> {
    let message = user
        .inbox
        .iter()
        .find(|m| m.id == message_id)
        .ok_or(RewardError::UnknownMessage)?;
    if message.claimed {
        return Err(RewardError::AlreadyClaimed);
    }
    let offer = message
        .offer
        .as_ref()
        .ok_or(RewardError::NoOfferAttached)?;
    if offer.is_expired(now) {
        return Err(RewardError::OfferExpired);
    }

    let mut updated = user.clone();
    let kind = offer.kind.clone();
    apply_offer(&mut updated, &kind, now);
    for m in updated.inbox.iter_mut() {
        if m.id == message_id {
            m.claimed = true;
            m.read = true;
        }
    }
    let updated = wallet.commit(updated).await?;
    info!(user_id = %updated.id, message_id, "inbox offer claimed");
    Ok(updated)
}

/// Mark every inbox message read (claim state untouched).
pub async fn mark_inbox_read(wallet: &WalletLedger, user: &User) -> Result<User, RewardError> {
    let mut updated = user.clone();
    for m in updated.inbox.iter_mut() {
        m.read = true;
    }
    let updated = wallet.commit(updated).await?;
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
