//! Redeem-code workflow.
//!
//! Codes are admin-issued records in the synchronized store. Redemption
//! marks the code consumed *first* (dual write, so both tiers converge on
//! `is_redeemed`), then credits the user. A code that fails validation
//! mutates nothing.

use tracing::info;

use lgk_schemas::{RedeemCode, User};
use lgk_store::redeem_code_key;

use crate::error::WalletError;
use crate::ledger::WalletLedger;
use crate::mutations;

impl WalletLedger {
    /// Redeem `code` for the user. Returns the updated snapshot and the
    /// credited amount.
    ///
    /// # Errors
    /// - [`WalletError::InvalidRedeemCode`] — no record for the code (a
    ///   corrupt record counts as invalid, not as a crash).
    /// - [`WalletError::AlreadyRedeemed`] — the code was consumed before;
    ///   the balance is unchanged.
    pub async fn redeem_code(&self, user: &User, code: &str) -> Result<(User, u32), WalletError> {
        let cleaned = code.trim().to_uppercase();
        if cleaned.is_empty() {
            return Err(WalletError::InvalidRedeemCode);
        }

        let key = redeem_code_key(&cleaned);
        let raw = self
            .store()
            .read(&key)
            .await?
            .ok_or(WalletError::InvalidRedeemCode)?;
        let mut record: RedeemCode =
            serde_json::from_value(raw).map_err(|_| WalletError::InvalidRedeemCode)?;

        if record.is_redeemed {
            return Err(WalletError::AlreadyRedeemed);
        }

        // Consume the code before crediting; if the credit commit fails the
        // user retries against an already-consumed code rather than the
        // store ever paying out twice.
        record.is_redeemed = true;
        record.redeemed_by = Some(user.id.clone());
        let encoded = serde_json::to_value(&record)
            .map_err(|e| lgk_store::StoreError::Encode(format!("encode redeem code: {e}")))?;
        self.store().write(&key, encoded).await?;

        let mut updated = user.clone();
        mutations::credit(&mut updated, record.amount);
        updated.redeemed_codes.push(record.code.clone());
        let updated = self.commit(updated).await?;

        info!(user_id = %updated.id, code = %record.code, amount = record.amount, "code redeemed");
        Ok((updated, record.amount))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use lgk_store::{DualStore, MemoryStore, StoreBackend};
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    fn wallet() -> (WalletLedger, Arc<MemoryStore>, Arc<MemoryStore>) {
        let local = Arc::new(MemoryStore::new("local"));
        let remote = Arc::new(MemoryStore::new("remote"));
        let store = DualStore::new(local.clone(), remote.clone());
        (WalletLedger::new(Arc::new(store)), local, remote)
    }

    fn student(credits: u32) -> User {
        let mut user = User::new_student("u-1", "Asha", now());
        user.credits = credits;
        user
    }

    async fn seed_code(remote: &MemoryStore, code: &str, amount: u32, redeemed: bool) {
        remote
            .put(
                &redeem_code_key(code),
                json!({ "code": code, "amount": amount, "is_redeemed": redeemed }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn valid_code_credits_and_marks_consumed() {
        let (wallet, local, remote) = wallet();
        seed_code(&remote, "LG-10-X9Z2", 10, false).await;
        let user = student(2);

        let (updated, amount) = wallet.redeem_code(&user, "lg-10-x9z2").await.unwrap();
        assert_eq!(amount, 10);
        assert_eq!(updated.credits, 12);
        assert_eq!(updated.redeemed_codes, vec!["LG-10-X9Z2".to_string()]);

        // The consumed flag landed in the local cache (the write path).
        let stored = local
            .get(&redeem_code_key("LG-10-X9Z2"))
            .await
            .unwrap()
            .unwrap();
        let stored: RedeemCode = serde_json::from_value(stored).unwrap();
        assert!(stored.is_redeemed);
        assert_eq!(stored.redeemed_by, Some("u-1".to_string()));
    }

    #[tokio::test]
    async fn already_redeemed_code_changes_nothing() {
        let (wallet, _local, remote) = wallet();
        seed_code(&remote, "LG-5-USED", 5, true).await;
        let user = student(2);

        let err = wallet.redeem_code(&user, "LG-5-USED").await.unwrap_err();
        assert_eq!(err, WalletError::AlreadyRedeemed);
        assert_eq!(user.credits, 2);
    }

    #[tokio::test]
    async fn unknown_code_is_invalid() {
        let (wallet, _local, _remote) = wallet();
        let user = student(0);
        let err = wallet.redeem_code(&user, "NOPE").await.unwrap_err();
        assert_eq!(err, WalletError::InvalidRedeemCode);
    }

    #[tokio::test]
    async fn blank_code_is_invalid() {
        let (wallet, _local, _remote) = wallet();
        let user = student(0);
        let err = wallet.redeem_code(&user, "   ").await.unwrap_err();
        assert_eq!(err, WalletError::InvalidRedeemCode);
    }

    #[tokio::test]
    async fn corrupt_code_record_is_invalid_not_fatal() {
        let (wallet, _local, remote) = wallet();
        remote
            .put(&redeem_code_key("BROKEN"), json!("not a record"))
            .await
            .unwrap();
        let user = student(0);
        let err = wallet.redeem_code(&user, "BROKEN").await.unwrap_err();
        assert_eq!(err, WalletError::InvalidRedeemCode);
    }

    #[tokio::test]
    async fn same_code_rejected_on_second_redeem() {
        let (wallet, _local, remote) = wallet();
        seed_code(&remote, "LG-3-ONCE", 3, false).await;
        let user = student(0);

        let (updated, _) = wallet.redeem_code(&user, "LG-3-ONCE").await.unwrap();
        let err = wallet.redeem_code(&updated, "LG-3-ONCE").await.unwrap_err();
        assert_eq!(err, WalletError::AlreadyRedeemed);
        assert_eq!(updated.credits, 3);
    }
}
