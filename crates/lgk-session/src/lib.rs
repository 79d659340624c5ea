//! lgk-session
//!
//! Session orchestration: the explicitly passed, process-scoped context that
//! owns the user snapshot, threads it through the entitlement/wallet/reward
//! engines, and drives the single authoritative timer loop.
//!
//! There are no module-level singletons. A [`SessionContext`] is built at
//! login, replaced field-by-field by realtime reconciliation while it lives,
//! and torn down at logout — which cancels the timer loop and releases the
//! remote-change subscriptions, so no orphaned tick can mutate a stale user.

mod collaborators;
mod content;
mod context;
mod error;
mod timers;

pub use collaborators::{
    format_package_message, format_plan_message, payment_link, ContentFetcher, FetchError,
    LessonPayload, LessonRequest, PaymentHandoff,
};
pub use content::{ContentError, ContentGrant};
pub use context::{OfferDecision, SessionContext, SessionDeps};
pub use error::SessionError;
