//! lgk-rewards
//!
//! Milestone & reward engine: behavior-triggered grants driven by elapsed
//! study time, test participation, and the spin wheel.
//!
//! The timer-driven core is a per-user per-calendar-day state machine
//! ([`DayProgress`]): a seconds counter plus the set of milestone thresholds
//! that already fired today. Persisting the fired set — not only the raw
//! counter — is what keeps threshold firing idempotent when the counter is
//! reloaded from storage on resume.
//!
//! Offers produced here flow through a claim/ignore workflow: claim merges
//! the grant into the wallet immediately; ignore queues the offer into the
//! user's inbox, still subject to its own expiry. A claimed offer can never
//! be claimed again — the state machine rejects the transition, it does not
//! delete history.

mod bonus;
mod error;
mod goal;
mod lookback;
mod milestones;
mod offers;
mod participation;
mod spin;

pub use bonus::{maybe_grant_first_session_bonus, FIRST_SESSION_BONUS_HOURS};
pub use error::RewardError;
pub use goal::{can_claim_daily_goal, claim_daily_goal, goal_met};
pub use lookback::run_next_day_lookback;
pub use milestones::{DayProgress, Milestone, MilestoneEngine, MILESTONES, OFFER_TTL_HOURS};
pub use offers::{claim_inbox_offer, claim_offer, mark_inbox_read, queue_offer};
pub use participation::{
    begin_test_attempt, complete_test_attempt, TestAttempt, PARTICIPATION_REWARD_HOURS,
};
pub use spin::{pick_prize, settle_spin, spin_limit, spins_remaining};
