//! Well-known logical keys.
//!
//! All persisted state is plain key → JSON-value pairs; these builders keep
//! key shapes in one place. Catalog records are keyed by the composite
//! content key rendered in lgk-schemas and need no builder here.

use chrono::NaiveDate;

/// Whole-snapshot user record.
pub fn user_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Pointer to the logged-in user id, read at session start.
pub fn session_current_user_key() -> &'static str {
    "session:current_user"
}

/// Process-wide settings snapshot.
pub fn settings_key() -> &'static str {
    "system:settings"
}

/// Per-day accumulated activity (seconds + fired milestone thresholds).
pub fn activity_key(user_id: &str, date: NaiveDate) -> String {
    format!("activity:{user_id}:{date}")
}

/// Marker set once the next-day lookback has handled `date`.
pub fn lookback_marker_key(user_id: &str, date: NaiveDate) -> String {
    format!("lookback:{user_id}:{date}")
}

/// Remote-only liveness beacon.
pub fn user_liveness_key(user_id: &str) -> String {
    format!("liveness:{user_id}")
}

/// The user's personal daily study goal, in hours.
pub fn daily_goal_key(user_id: &str) -> String {
    format!("goal:{user_id}")
}

/// Persisted start timestamp of an in-flight test attempt.
pub fn test_attempt_start_key(user_id: &str, test_id: &str) -> String {
    format!("test_start:{user_id}:{test_id}")
}

/// Submitted test attempt, visible to admin flows via the remote store.
pub fn test_result_key(user_id: &str, test_id: &str, submitted_at_millis: i64) -> String {
    format!("test_result:{user_id}:{test_id}:{submitted_at_millis}")
}

/// Admin-issued redeem code record.
pub fn redeem_code_key(code: &str) -> String {
    format!("redeem_code:{code}")
}

/// One-time UI gate flags.
pub fn terms_accepted_key() -> &'static str {
    "flags:terms_accepted"
}

pub fn welcome_seen_key() -> &'static str {
    "flags:welcome_seen"
}
