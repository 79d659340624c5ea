use std::fmt;

use lgk_store::StoreError;
use lgk_wallet::WalletError;

/// Failures of the reward workflows. All user-visible variants leave the
/// user record unmutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    /// The offer's own expiry passed before it was claimed.
    OfferExpired,
    /// The state machine rejects a second claim of a resolved offer.
    AlreadyClaimed,
    /// No inbox message with the given id.
    UnknownMessage,
    /// No pending offer with the given id.
    UnknownOffer,
    /// The inbox message carries no offer (plain admin text).
    NoOfferAttached,
    /// Daily goal not reached yet.
    GoalNotMet,
    /// The daily-goal reward was already claimed today.
    AlreadyClaimedToday,
    /// Daily spin allowance exhausted.
    SpinLimitReached { used: u32, limit: u32 },
    Wallet(WalletError),
    Store(StoreError),
}

impl fmt::Display for RewardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardError::OfferExpired => write!(f, "reward offer has expired"),
            RewardError::AlreadyClaimed => write!(f, "reward offer was already claimed"),
            RewardError::UnknownMessage => write!(f, "no such inbox message"),
            RewardError::UnknownOffer => write!(f, "no such pending offer"),
            RewardError::NoOfferAttached => write!(f, "inbox message carries no reward offer"),
            RewardError::GoalNotMet => write!(f, "daily goal not reached"),
            RewardError::AlreadyClaimedToday => {
                write!(f, "daily goal reward already claimed today")
            }
            RewardError::SpinLimitReached { used, limit } => {
                write!(f, "daily spin limit reached ({used}/{limit})")
            }
            RewardError::Wallet(err) => write!(f, "{err}"),
            RewardError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RewardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RewardError::Wallet(err) => Some(err),
            RewardError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WalletError> for RewardError {
    fn from(err: WalletError) -> Self {
        RewardError::Wallet(err)
    }
}

impl From<StoreError> for RewardError {
    fn from(err: StoreError) -> Self {
        RewardError::Store(err)
    }
}
