//! lgk-entitlement
//!
//! Pure access resolver: decides, for one content request, whether the
//! requesting user may consume it and at what cost.
//!
//! No IO, no clock lookups, no mutation — `now` is an input and all charging
//! is delegated to the wallet ledger by the caller after an
//! [`AccessDecision::AllowAfterCharge`]. This keeps entitlement logic
//! independently testable without wallet state.

mod pricing;
mod resolve;

pub use pricing::effective_price;
pub use resolve::{
    resolve, AccessContext, AccessDecision, AllowReason, DenyReason, BASIC_CONTENT_TYPES,
};
