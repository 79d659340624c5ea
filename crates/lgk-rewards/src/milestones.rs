use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use lgk_schemas::{RewardKind, RewardOffer, SubscriptionLevel};
use lgk_store::{activity_key, DualStore};

use crate::error::RewardError;

/// How long a produced offer stays claimable.
pub const OFFER_TTL_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Milestone table
// ---------------------------------------------------------------------------

enum MilestoneReward {
    Coins(u32),
    Subscription {
        tier: &'static str,
        level: SubscriptionLevel,
        duration_hours: u32,
    },
}

/// One study-time threshold. Fires at most once per calendar day.
pub struct Milestone {
    /// Elapsed seconds since local midnight.
    pub at_seconds: u32,
    pub label: &'static str,
    reward: MilestoneReward,
}

impl Milestone {
    pub fn reward_kind(&self) -> RewardKind {
        match &self.reward {
            MilestoneReward::Coins(amount) => RewardKind::Coins { amount: *amount },
            MilestoneReward::Subscription {
                tier,
                level,
                duration_hours,
            } => RewardKind::Subscription {
                tier: tier.to_string(),
                level: *level,
                duration_hours: *duration_hours,
            },
        }
    }

    /// Materialize the offer this milestone grants, expiring in
    /// [`OFFER_TTL_HOURS`].
    pub fn to_offer(&self, now: DateTime<Utc>) -> RewardOffer {
        RewardOffer::new(
            self.reward_kind(),
            self.label,
            now + Duration::hours(OFFER_TTL_HOURS),
        )
    }
}

/// The daily reward ladder, ordered by threshold.
pub static MILESTONES: [Milestone; 4] = [
    Milestone {
        at_seconds: 600,
        label: "10 mins study: 2 coins",
        reward: MilestoneReward::Coins(2),
    },
    Milestone {
        at_seconds: 1800,
        label: "30 mins study: 4 coins",
        reward: MilestoneReward::Coins(4),
    },
    Milestone {
        at_seconds: 3600,
        label: "1 hour study: free Basic access (4h)",
        reward: MilestoneReward::Subscription {
            tier: "WEEKLY",
            level: SubscriptionLevel::Basic,
            duration_hours: 4,
        },
    },
    Milestone {
        at_seconds: 7200,
        label: "2 hours study: free Ultra access (4h)",
        reward: MilestoneReward::Subscription {
            tier: "LIFETIME",
            level: SubscriptionLevel::Ultra,
            duration_hours: 4,
        },
    },
];

// ---------------------------------------------------------------------------
// DayProgress
// ---------------------------------------------------------------------------

/// Per-user per-calendar-day accumulator.
///
/// `fired` records thresholds that already produced an offer today; it is
/// persisted alongside the counter so that reloading `seconds` from storage
/// can never re-fire a threshold the same counter value already fired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    #[serde(default)]
    pub seconds: u32,
    #[serde(default)]
    pub fired: BTreeSet<u32>,
}

impl DayProgress {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            seconds: 0,
            fired: BTreeSet::new(),
        }
    }

    /// Reset the accumulator when the calendar day changed.
    pub fn roll_to(&mut self, date: NaiveDate) {
        if self.date != date {
            *self = DayProgress::new(date);
        }
    }

    /// Advance the counter by one second; return the milestone that crossed,
    /// if any. At most one fires per tick — after a resume that skipped
    /// several thresholds, the backlog drains one per subsequent tick.
    pub fn tick(&mut self) -> Option<&'static Milestone> {
        self.seconds = self.seconds.saturating_add(1);
        self.due_milestone()
    }

    /// The lowest unfired milestone at or below the current counter, marked
    /// fired on return. Idempotent: repeated calls at the same counter value
    /// never yield the same milestone twice.
    pub fn due_milestone(&mut self) -> Option<&'static Milestone> {
        for milestone in MILESTONES.iter() {
            if self.seconds >= milestone.at_seconds && !self.fired.contains(&milestone.at_seconds) {
                self.fired.insert(milestone.at_seconds);
                return Some(milestone);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// MilestoneEngine
// ---------------------------------------------------------------------------

/// Storage-backed wrapper around [`DayProgress`] for one user.
///
/// Every tick persists to the local cache only — a per-second counter needs
/// crash durability, not cross-device convergence. [`MilestoneEngine::publish`]
/// pushes the consolidated snapshot through the dual store on the owning
/// loop's slower cadence, which is what the next-day lookback reads.
pub struct MilestoneEngine {
    store: Arc<DualStore>,
    user_id: String,
    progress: DayProgress,
}

impl MilestoneEngine {
    /// Load today's progress from the local cache, starting fresh when the
    /// stored record is absent, stale, or undecodable.
    pub async fn load(
        store: Arc<DualStore>,
        user_id: impl Into<String>,
        today: NaiveDate,
    ) -> Result<Self, RewardError> {
        let user_id = user_id.into();
        let progress = match store.read(&activity_key(&user_id, today)).await? {
            Some(raw) => serde_json::from_value::<DayProgress>(raw)
                .ok()
                .filter(|p| p.date == today)
                .unwrap_or_else(|| DayProgress::new(today)),
            None => DayProgress::new(today),
        };
        Ok(Self {
            store,
            user_id,
            progress,
        })
    }

    pub fn seconds_today(&self) -> u32 {
        self.progress.seconds
    }

    pub fn progress(&self) -> &DayProgress {
        &self.progress
    }

    /// One second of active study. Rolls the day over when `now` crossed
    /// midnight, persists the counter, and returns a newly produced offer
    /// when a threshold fired.
    pub async fn on_tick(&mut self, now: DateTime<Utc>) -> Result<Option<RewardOffer>, RewardError> {
        self.progress.roll_to(now.date_naive());
        let fired = self.progress.tick();
        let offer = fired.map(|m| {
            debug!(user_id = %self.user_id, at_seconds = m.at_seconds, label = m.label, "milestone fired");
            m.to_offer(now)
        });
        self.persist_local().await?;
        Ok(offer)
    }

    /// Push the current day snapshot through the dual store (remote
    /// best-effort), making it visible to other devices and to tomorrow's
    /// lookback.
    pub async fn publish(&self) -> Result<(), RewardError> {
        let value = serde_json::to_value(&self.progress)
            .map_err(|e| lgk_store::StoreError::Encode(format!("encode day progress: {e}")))?;
        self.store
            .write(&activity_key(&self.user_id, self.progress.date), value)
            .await?;
        Ok(())
    }

    async fn persist_local(&self) -> Result<(), RewardError> {
        let value = serde_json::to_value(&self.progress)
            .map_err(|e| lgk_store::StoreError::Encode(format!("encode day progress: {e}")))?;
        self.store
            .write_local(&activity_key(&self.user_id, self.progress.date), value)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lgk_store::MemoryStore;

    fn today() -> NaiveDate {
        "2026-03-01".parse().unwrap()
    }

    fn at(seconds: u32) -> DateTime<Utc> {
        "2026-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::seconds(seconds as i64)
    }

    fn dual() -> Arc<DualStore> {
        Arc::new(DualStore::new(
            Arc::new(MemoryStore::new("local")),
            Arc::new(MemoryStore::new("remote")),
        ))
    }

    #[test]
    fn thresholds_fire_once_in_order() {
        let mut progress = DayProgress::new(today());
        let mut fired = Vec::new();
        for _ in 0..7200 {
            if let Some(m) = progress.tick() {
                fired.push(m.at_seconds);
            }
        }
        assert_eq!(fired, vec![600, 1800, 3600, 7200]);
    }

    #[test]
    fn same_counter_value_never_fires_twice() {
        let mut progress = DayProgress::new(today());
        progress.seconds = 599;
        assert!(progress.tick().is_some()); // 600 fires
        // Simulate a reload that replays the same counter value.
        let snapshot = progress.clone();
        let mut reloaded = snapshot;
        assert!(reloaded.due_milestone().is_none());
    }

    #[test]
    fn backlog_after_resume_drains_one_per_tick() {
        // Counter restored past two thresholds with nothing fired (the
        // process died before the offers were produced).
        let mut progress = DayProgress::new(today());
        progress.seconds = 2000;

        let first = progress.tick().unwrap();
        assert_eq!(first.at_seconds, 600);
        let second = progress.tick().unwrap();
        assert_eq!(second.at_seconds, 1800);
        assert!(progress.tick().is_none());
    }

    #[test]
    fn day_rollover_resets_counter_and_fired_set() {
        let mut progress = DayProgress::new(today());
        progress.seconds = 4000;
        progress.fired.insert(600);
        progress.roll_to("2026-03-02".parse().unwrap());
        assert_eq!(progress.seconds, 0);
        assert!(progress.fired.is_empty());
    }

    #[test]
    fn milestone_offers_carry_the_reward_table() {
        let offer = MILESTONES[2].to_offer(at(3600));
        match &offer.kind {
            RewardKind::Subscription {
                level,
                duration_hours,
                ..
            } => {
                assert_eq!(*level, SubscriptionLevel::Basic);
                assert_eq!(*duration_hours, 4);
            }
            other => panic!("expected subscription, got {other:?}"),
        }
        assert_eq!(offer.expires_at, at(3600) + Duration::hours(24));
    }

    #[tokio::test]
    async fn engine_emits_offer_exactly_once_at_threshold() {
        let store = dual();
        let mut engine = MilestoneEngine::load(store, "u-1", today()).await.unwrap();

        let mut offers = Vec::new();
        for s in 0..700u32 {
            if let Some(offer) = engine.on_tick(at(s)).await.unwrap() {
                offers.push(offer);
            }
        }
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].kind, RewardKind::Coins { amount: 2 });
        assert_eq!(engine.seconds_today(), 700);
    }

    #[tokio::test]
    async fn engine_state_survives_reload() {
        let store = dual();
        {
            let mut engine =
                MilestoneEngine::load(store.clone(), "u-1", today()).await.unwrap();
            for s in 0..650u32 {
                let _ = engine.on_tick(at(s)).await.unwrap();
            }
        }

        // New engine instance (process restart) resumes from storage.
        let mut engine = MilestoneEngine::load(store, "u-1", today()).await.unwrap();
        assert_eq!(engine.seconds_today(), 650);
        // The 600s threshold must not re-fire.
        for s in 650..700u32 {
            assert!(engine.on_tick(at(s)).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn corrupt_stored_progress_starts_fresh() {
        let store = dual();
        store
            .write_local(&activity_key("u-1", today()), serde_json::json!("garbage"))
            .await
            .unwrap();
        let engine = MilestoneEngine::load(store, "u-1", today()).await.unwrap();
        assert_eq!(engine.seconds_today(), 0);
    }

    #[tokio::test]
    async fn midnight_rollover_restarts_the_ladder() {
        let store = dual();
        let mut engine = MilestoneEngine::load(store, "u-1", today()).await.unwrap();
        engine.progress.seconds = 3599;
        engine.progress.fired.extend([600u32, 1800]);

        // Next tick is already tomorrow.
        let tomorrow: DateTime<Utc> = "2026-03-02T00:00:01Z".parse().unwrap();
        let offer = engine.on_tick(tomorrow).await.unwrap();
        assert!(offer.is_none());
        assert_eq!(engine.seconds_today(), 1);
        assert_eq!(engine.progress().date, "2026-03-02".parse::<NaiveDate>().unwrap());
    }
}
