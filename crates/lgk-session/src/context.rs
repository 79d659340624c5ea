use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

use lgk_audit::ActivityLog;
use lgk_config::{decode_settings, SystemSettings};
use lgk_reconcile::{spawn_reconciler, ReconcilerHandle};
use lgk_rewards::{
    claim_daily_goal, claim_inbox_offer, claim_offer, mark_inbox_read, queue_offer,
    run_next_day_lookback, settle_spin, MilestoneEngine, RewardError,
};
use lgk_schemas::{
    CreditPackage, RewardOffer, Role, SubscriptionLevel, SubscriptionPlan, User,
};
use lgk_store::{
    daily_goal_key, session_current_user_key, settings_key, terms_accepted_key, user_key,
    welcome_seen_key, DualStore,
};
use lgk_wallet::WalletLedger;

use crate::collaborators::{
    format_package_message, format_plan_message, payment_link, ContentFetcher, PaymentHandoff,
};
use crate::error::SessionError;
use crate::timers::TimerHandle;

const DEFAULT_GOAL_HOURS: u32 = 3;

/// How a surfaced offer gets resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferDecision {
    /// Merge into the wallet now.
    ClaimNow,
    /// Queue into the inbox for a later decision.
    Ignore,
}

/// Everything a session needs injected by the host.
pub struct SessionDeps {
    pub store: Arc<DualStore>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub payments: Arc<dyn PaymentHandoff>,
    /// Activity log location (JSONL).
    pub audit_path: PathBuf,
}

/// Process-scoped session context.
///
/// Holds the exclusive in-memory owner copy of the user record. All
/// mutation goes through the wallet ledger; the snapshot here is replaced
/// only after a mutation committed, or by realtime reconciliation when the
/// remote store pushes an authoritative correction.
pub struct SessionContext {
    pub(crate) store: Arc<DualStore>,
    pub(crate) wallet: WalletLedger,
    pub(crate) user: Arc<RwLock<User>>,
    pub(crate) settings: Arc<RwLock<SystemSettings>>,
    pub(crate) engine: Mutex<MilestoneEngine>,
    pub(crate) offers_tx: broadcast::Sender<RewardOffer>,
    pub(crate) audit: StdMutex<ActivityLog>,
    pub(crate) fetcher: Arc<dyn ContentFetcher>,
    payments: Arc<dyn PaymentHandoff>,
    original_admin: RwLock<Option<User>>,
    goal_hours: RwLock<u32>,
    reconciler: StdMutex<Option<ReconcilerHandle>>,
    timer: StdMutex<Option<TimerHandle>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Start a session for a stored user: load and defensively decode the
    /// snapshot, refuse locked accounts, run the next-day lookback, attach
    /// realtime reconciliation, and start the timer loop.
    pub async fn start(deps: SessionDeps, user_id: &str) -> Result<Arc<Self>, SessionError> {
        let now = Utc::now();

        // Settings come from the local cache at startup; reconciliation
        // overrides them continuously afterwards.
        let settings = decode_settings(deps.store.read(settings_key()).await?);

        let raw_user = deps
            .store
            .read(&user_key(user_id))
            .await?
            .ok_or_else(|| SessionError::UserNotFound(user_id.to_string()))?;
        let user: User = serde_json::from_value(raw_user)
            .map_err(|_| SessionError::UserNotFound(user_id.to_string()))?;
        if user.is_locked {
            return Err(SessionError::AccountLocked);
        }

        deps.store
            .write_local(session_current_user_key(), json!(user.id))
            .await?;

        let goal_hours = match deps.store.read(&daily_goal_key(user_id)).await? {
            Some(raw) => serde_json::from_value(raw).unwrap_or(DEFAULT_GOAL_HOURS),
            None => DEFAULT_GOAL_HOURS,
        };

        let wallet = WalletLedger::new(Arc::clone(&deps.store));

        // Deferred rewards for yesterday's recorded activity.
        let user = match run_next_day_lookback(&deps.store, &wallet, &user, now).await {
            Ok(Some(updated)) => updated,
            Ok(None) => user,
            Err(err) => {
                warn!(error = %err, "next-day lookback failed; continuing without it");
                user
            }
        };

        let engine =
            MilestoneEngine::load(Arc::clone(&deps.store), user_id, now.date_naive()).await?;
        let audit = ActivityLog::open(&deps.audit_path, lgk_audit::DEFAULT_CAP)
            .map_err(|e| lgk_store::StoreError::Io(format!("open activity log: {e}")))?;

        let (offers_tx, _) = broadcast::channel(16);
        let ctx = Arc::new(Self {
            store: Arc::clone(&deps.store),
            wallet,
            user: Arc::new(RwLock::new(user)),
            settings: Arc::new(RwLock::new(settings)),
            engine: Mutex::new(engine),
            offers_tx,
            audit: StdMutex::new(audit),
            fetcher: deps.fetcher,
            payments: deps.payments,
            original_admin: RwLock::new(None),
            goal_hours: RwLock::new(goal_hours),
            reconciler: StdMutex::new(None),
            timer: StdMutex::new(None),
        });

        let reconciler = spawn_reconciler(
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.user),
            Arc::clone(&ctx.settings),
        )
        .await?;
        *ctx.reconciler.lock().expect("reconciler slot") = Some(reconciler);
        *ctx.timer.lock().expect("timer slot") = Some(crate::timers::spawn_session_timer(
            Arc::clone(&ctx),
        ));

        ctx.log_activity("LOGIN", "session started").await;
        info!(user_id, "session started");
        Ok(ctx)
    }

    /// End the session: stop the timer loop, release the remote
    /// subscriptions, clear the current-user pointer.
    pub async fn logout(&self) {
        self.log_activity("LOGOUT", "session ended").await;

        if let Some(timer) = self.timer.lock().expect("timer slot").take() {
            timer.stop();
        }
        if let Some(reconciler) = self.reconciler.lock().expect("reconciler slot").take() {
            reconciler.stop();
        }
        if let Err(err) = self
            .store
            .local()
            .remove(session_current_user_key())
            .await
        {
            warn!(error = %err, "failed to clear current-user pointer");
        }
        info!("session ended");
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub async fn user(&self) -> User {
        self.user.read().await.clone()
    }

    pub async fn settings(&self) -> SystemSettings {
        self.settings.read().await.clone()
    }

    pub async fn seconds_today(&self) -> u32 {
        self.engine.lock().await.seconds_today()
    }

    pub async fn daily_goal_hours(&self) -> u32 {
        *self.goal_hours.read().await
    }

    /// Adopt a committed snapshot as the new in-memory state.
    pub(crate) async fn adopt_user(&self, user: User) {
        *self.user.write().await = user;
    }

    // -----------------------------------------------------------------------
    // Offers
    // -----------------------------------------------------------------------

    /// Listen for offers produced by the milestone loop (modal surface).
    pub fn subscribe_offers(&self) -> broadcast::Receiver<RewardOffer> {
        self.offers_tx.subscribe()
    }

    /// Resolve a pending offer by id: claim it into the wallet or queue it
    /// to the inbox. Either way the offer leaves the pending queue.
    pub async fn resolve_pending_offer(
        &self,
        offer_id: &str,
        decision: OfferDecision,
    ) -> Result<(), SessionError> {
        let now = Utc::now();
        let user = self.user().await;
        let Some(offer) = user.pending_rewards.iter().find(|o| o.id == offer_id).cloned() else {
            return Err(RewardError::UnknownOffer.into());
        };

        let mut drained = user.clone();
        drained.pending_rewards.retain(|o| o.id != offer_id);

        let updated = match decision {
            OfferDecision::ClaimNow => {
                match claim_offer(&self.wallet, &drained, &offer, now).await {
                    Ok(updated) => updated,
                    Err(RewardError::OfferExpired) => {
                        // Expired offers drain without merging.
                        let updated = self.wallet.commit(drained).await?;
                        self.adopt_user(updated).await;
                        return Err(RewardError::OfferExpired.into());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            OfferDecision::Ignore => queue_offer(&self.wallet, &drained, offer, now).await?,
        };
        self.adopt_user(updated).await;
        Ok(())
    }

    /// Claim an offer parked in the inbox.
    pub async fn claim_from_inbox(&self, message_id: &str) -> Result<(), SessionError> {
        let user = self.user().await;
        let updated = claim_inbox_offer(&self.wallet, &user, message_id, Utc::now()).await?;
        self.adopt_user(updated).await;
        Ok(())
    }

    pub async fn mark_inbox_read(&self) -> Result<(), SessionError> {
        let user = self.user().await;
        let updated = mark_inbox_read(&self.wallet, &user).await?;
        self.adopt_user(updated).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Daily goal
    // -----------------------------------------------------------------------

    pub async fn set_daily_goal(&self, hours: u32) -> Result<(), SessionError> {
        let hours = hours.clamp(1, 12);
        let user_id = self.user.read().await.id.clone();
        self.store
            .write(&daily_goal_key(&user_id), json!(hours))
            .await?;
        *self.goal_hours.write().await = hours;
        Ok(())
    }

    pub async fn claim_daily_goal_reward(&self) -> Result<(), SessionError> {
        let now = Utc::now();
        let user = self.user().await;
        let settings = self.settings().await;
        let seconds = self.seconds_today().await;
        let goal = self.daily_goal_hours().await;
        let updated = claim_daily_goal(
            &self.wallet,
            &user,
            seconds,
            goal,
            &settings,
            now.date_naive(),
        )
        .await?;
        self.adopt_user(updated).await;
        self.log_activity("GOAL_CLAIM", "daily goal reward claimed").await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Spin / redeem
    // -----------------------------------------------------------------------

    /// Settle one spin with the caller-supplied roll in `[0, 1)`. Returns
    /// the amount won.
    pub async fn spin(&self, roll: f64) -> Result<u32, SessionError> {
        let user = self.user().await;
        let settings = self.settings().await;
        let (updated, won) = settle_spin(&self.wallet, &user, &settings, Utc::now(), roll).await?;
        self.adopt_user(updated).await;
        Ok(won)
    }

    /// Redeem a gift code. Returns the credited amount.
    pub async fn redeem(&self, code: &str) -> Result<u32, SessionError> {
        let user = self.user().await;
        let (updated, amount) = self.wallet.redeem_code(&user, code).await?;
        self.adopt_user(updated).await;
        self.log_activity("REDEEM", &format!("code redeemed for {amount} credits"))
            .await;
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Payments (fire-and-forget external handoff)
    // -----------------------------------------------------------------------

    pub async fn buy_package(&self, package: &CreditPackage) {
        let user_id = self.user.read().await.id.clone();
        let contact = self.settings.read().await.payment_contact.clone();
        let message = format_package_message(&user_id, package);
        let link = payment_link(&contact, &message);
        self.payments.open_external(&message, &link);
        self.log_activity("BUY_PACKAGE", &package.name).await;
    }

    pub async fn buy_plan(&self, plan: &SubscriptionPlan, level: SubscriptionLevel) {
        let user_id = self.user.read().await.id.clone();
        let contact = self.settings.read().await.payment_contact.clone();
        let message = format_plan_message(&user_id, plan, level);
        let link = payment_link(&contact, &message);
        self.payments.open_external(&message, &link);
        self.log_activity("BUY_PLAN", &format!("{} {}", plan.name, level.as_str()))
            .await;
    }

    // -----------------------------------------------------------------------
    // One-time UI gate flags
    // -----------------------------------------------------------------------

    /// Whether the terms popup was already accepted on this device.
    pub async fn terms_accepted(&self) -> bool {
        matches!(
            self.store.read(terms_accepted_key()).await,
            Ok(Some(serde_json::Value::Bool(true)))
        )
    }

    pub async fn accept_terms(&self) -> Result<(), SessionError> {
        self.store.write_local(terms_accepted_key(), json!(true)).await?;
        Ok(())
    }

    /// Whether the welcome screen was already shown on this device.
    pub async fn welcome_seen(&self) -> bool {
        matches!(
            self.store.read(welcome_seen_key()).await,
            Ok(Some(serde_json::Value::Bool(true)))
        )
    }

    pub async fn mark_welcome_seen(&self) -> Result<(), SessionError> {
        self.store.write_local(welcome_seen_key(), json!(true)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Impersonation
    // -----------------------------------------------------------------------

    /// Admin-only: view the app as `target`. The admin's own snapshot is
    /// parked and restored by [`SessionContext::end_impersonation`].
    pub async fn begin_impersonation(&self, target: User) -> Result<(), SessionError> {
        let current = self.user().await;
        if current.role != Role::Admin {
            return Err(SessionError::NotAnAdmin);
        }
        self.log_activity("IMPERSONATE", &format!("viewing as {}", target.name))
            .await;
        *self.original_admin.write().await = Some(current);
        self.adopt_user(target).await;
        Ok(())
    }

    pub async fn end_impersonation(&self) -> Result<(), SessionError> {
        let admin = self
            .original_admin
            .write()
            .await
            .take()
            .ok_or(SessionError::NotImpersonating)?;
        self.adopt_user(admin).await;
        Ok(())
    }

    pub async fn is_impersonating(&self) -> bool {
        self.original_admin.read().await.is_some()
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    pub(crate) async fn log_activity(&self, action: &str, details: &str) {
        let user = self.user.read().await;
        let role = match user.role {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
        };
        let result = self
            .audit
            .lock()
            .expect("audit lock")
            .append(&user.id, &user.name, role, action, details, Utc::now())
            .map(|_| ());
        if let Err(err) = result {
            warn!(error = %err, action, "activity log append failed");
        }
    }
}
