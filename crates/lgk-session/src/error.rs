use std::fmt;

use lgk_rewards::RewardError;
use lgk_store::StoreError;
use lgk_wallet::WalletError;

/// Session lifecycle and workflow failures. Nothing here is fatal to the
/// process; the worst case is a refused session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No stored snapshot for the requested user id.
    UserNotFound(String),
    /// The account is locked; the session is refused at start.
    AccountLocked,
    /// Only admins may impersonate.
    NotAnAdmin,
    /// No impersonation is active to end.
    NotImpersonating,
    Store(StoreError),
    Wallet(WalletError),
    Reward(RewardError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UserNotFound(id) => write!(f, "no stored user snapshot for {id}"),
            SessionError::AccountLocked => write!(f, "account is locked"),
            SessionError::NotAnAdmin => write!(f, "impersonation requires an admin session"),
            SessionError::NotImpersonating => write!(f, "no impersonation to end"),
            SessionError::Store(err) => write!(f, "{err}"),
            SessionError::Wallet(err) => write!(f, "{err}"),
            SessionError::Reward(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Store(err) => Some(err),
            SessionError::Wallet(err) => Some(err),
            SessionError::Reward(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Store(err)
    }
}

impl From<WalletError> for SessionError {
    fn from(err: WalletError) -> Self {
        SessionError::Wallet(err)
    }
}

impl From<RewardError> for SessionError {
    fn from(err: RewardError) -> Self {
        SessionError::Reward(err)
    }
}
