use std::fmt;

use lgk_store::StoreError;

/// Failures the wallet ledger can surface to the triggering action.
///
/// All of these are user-visible and non-fatal; none leaves a partial
/// mutation behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The charge exceeds the balance. Re-checked here even when the
    /// entitlement resolver already verified it, to guard the race between
    /// resolution and charging.
    InsufficientCredits { required: u32, available: u32 },
    /// No redeem code record exists for the entered code.
    InvalidRedeemCode,
    /// The code exists but was already consumed.
    AlreadyRedeemed,
    /// The local cache write failed; the mutation did not commit.
    Store(StoreError),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::InsufficientCredits {
                required,
                available,
            } => write!(
                f,
                "wallet invariant: charge of {required} credits exceeds balance {available}"
            ),
            WalletError::InvalidRedeemCode => write!(f, "invalid redeem code"),
            WalletError::AlreadyRedeemed => write!(f, "redeem code already redeemed"),
            WalletError::Store(err) => write!(f, "wallet persistence failed: {err}"),
        }
    }
}

impl std::error::Error for WalletError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WalletError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(err: StoreError) -> Self {
        WalletError::Store(err)
    }
}
