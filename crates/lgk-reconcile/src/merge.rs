use serde_json::Value;

use lgk_config::{decode_settings, SystemSettings};
use lgk_schemas::User;

/// Result of diffing one remote push against the in-memory snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum MergeOutcome<T> {
    /// Structurally identical — nothing to do.
    Unchanged,
    /// A real difference: the incoming snapshot replaces local state.
    Replaced(T),
    /// The payload did not decode as the expected record; ignored.
    Undecodable,
}

impl<T> MergeOutcome<T> {
    pub fn replaced(self) -> Option<T> {
        match self {
            MergeOutcome::Replaced(value) => Some(value),
            _ => None,
        }
    }
}

/// Diff an incoming remote user snapshot against the current one.
///
/// Structural equality, not timestamps, decides: an echo of our own write
/// comes back byte-equivalent and is dropped; anything different is
/// authoritative and replaces the snapshot wholesale. A push for a
/// different user id is ignored (a listener must never adopt someone
/// else's profile).
pub fn merge_remote_user(current: &User, incoming: Value) -> MergeOutcome<User> {
    let Ok(incoming) = serde_json::from_value::<User>(incoming) else {
        return MergeOutcome::Undecodable;
    };
    if incoming.id != current.id {
        return MergeOutcome::Undecodable;
    }
    if incoming == *current {
        MergeOutcome::Unchanged
    } else {
        MergeOutcome::Replaced(incoming)
    }
}

/// Diff an incoming settings push against the current snapshot. Settings
/// decode defensively (missing fields become defaults), so any object-shaped
/// payload merges; only non-objects are dropped.
pub fn merge_remote_settings(
    current: &SystemSettings,
    incoming: Value,
) -> MergeOutcome<SystemSettings> {
    if !incoming.is_object() {
        return MergeOutcome::Undecodable;
    }
    let incoming = decode_settings(Some(incoming));
    if incoming == *current {
        MergeOutcome::Unchanged
    } else {
        MergeOutcome::Replaced(incoming)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    fn student() -> User {
        User::new_student("u-1", "Asha", now())
    }

    #[test]
    fn identical_user_push_is_unchanged() {
        let current = student();
        let incoming = serde_json::to_value(&current).unwrap();
        assert_eq!(merge_remote_user(&current, incoming), MergeOutcome::Unchanged);
    }

    #[test]
    fn differing_user_push_replaces() {
        let current = student();
        let mut pushed = current.clone();
        pushed.credits = 50; // admin-side correction
        let incoming = serde_json::to_value(&pushed).unwrap();

        let merged = merge_remote_user(&current, incoming).replaced().unwrap();
        assert_eq!(merged.credits, 50);
    }

    #[test]
    fn foreign_profile_is_ignored() {
        let current = student();
        let other = User::new_student("u-2", "Ravi", now());
        let incoming = serde_json::to_value(&other).unwrap();
        assert_eq!(
            merge_remote_user(&current, incoming),
            MergeOutcome::Undecodable
        );
    }

    #[test]
    fn garbage_user_payload_is_ignored() {
        let current = student();
        assert_eq!(
            merge_remote_user(&current, serde_json::json!([1, 2, 3])),
            MergeOutcome::Undecodable
        );
    }

    #[test]
    fn settings_push_with_partial_object_merges_over_defaults() {
        let current = SystemSettings::default();
        let merged = merge_remote_settings(
            &current,
            serde_json::json!({ "daily_reward": 7 }),
        )
        .replaced()
        .unwrap();
        assert_eq!(merged.daily_reward, 7);
        // Fields the push omitted fall back to defaults, not to zero.
        assert_eq!(merged.premium_notes_price, 5);
    }

    #[test]
    fn settings_echo_is_unchanged() {
        let current = SystemSettings::default();
        let incoming = serde_json::to_value(&current).unwrap();
        assert_eq!(
            merge_remote_settings(&current, incoming),
            MergeOutcome::Unchanged
        );
    }

    #[test]
    fn non_object_settings_payload_is_ignored() {
        let current = SystemSettings::default();
        assert_eq!(
            merge_remote_settings(&current, serde_json::json!(null)),
            MergeOutcome::Undecodable
        );
    }
}
