//! lgk-store
//!
//! Dual-store synchronization layer: a local durable cache backed by a
//! remote synchronized store.
//!
//! Consistency model is eventual, last-write-wins at whole-record
//! granularity. Every write in this system replaces a complete snapshot;
//! callers needing partial-update semantics must re-read before writing.
//!
//! - [`DualStore::write`] — local cache first (the commit point), then
//!   fire-and-forget remote propagation. A remote failure is logged and
//!   counted, never surfaced: the local cache remains authoritative until
//!   the next successful propagation.
//! - [`DualStore::read`] — local cache first, remote on miss. A remote-only
//!   hit is **not** promoted back into the cache; silent cache promotion
//!   races are worse than an extra remote read, so callers that need
//!   locality re-write explicitly.
//! - [`DualStore::subscribe`] — change listener on the remote store; when no
//!   remote value exists yet, one fallback read of the local cache supplies
//!   the initial value, after which no dual subscription continues.

mod backend;
mod dual;
mod keys;

pub use backend::{JsonFileStore, MemoryStore, StoreBackend, StoreError};
pub use dual::{DualStore, WatchHandle};
pub use keys::{
    activity_key, daily_goal_key, lookback_marker_key, redeem_code_key, session_current_user_key,
    settings_key, terms_accepted_key, test_attempt_start_key, test_result_key, user_key,
    user_liveness_key, welcome_seen_key,
};
