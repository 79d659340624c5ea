use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use lgk_config::{settings_hash, SystemSettings};
use lgk_schemas::User;
use lgk_store::{settings_key, user_key, DualStore, StoreError};

use crate::merge::{merge_remote_settings, merge_remote_user, MergeOutcome};

/// Owner handle for the reconciler task.
///
/// The session must release it on teardown: [`ReconcilerHandle::stop`]
/// signals the loop, [`ReconcilerHandle::stopped`] additionally awaits exit.
/// Dropping the handle without stopping leaves the task running against a
/// stale session — exactly the orphaned-listener bug the handle exists to
/// prevent.
pub struct ReconcilerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub async fn stopped(self) {
        self.stop();
        let _ = self.task.await;
    }
}

/// Subscribe to the session user's profile and the global settings and fold
/// every authoritative remote push into the in-memory slots and the local
/// cache. Initial values (remote snapshot, or the local fallback) are
/// applied before this returns, so callers start from converged state.
pub async fn spawn_reconciler(
    store: Arc<DualStore>,
    user_slot: Arc<RwLock<User>>,
    settings_slot: Arc<RwLock<SystemSettings>>,
) -> Result<ReconcilerHandle, StoreError> {
    let user_id = user_slot.read().await.id.clone();
    let mut profile_sub = store.subscribe(&user_key(&user_id)).await?;
    let mut settings_sub = store.subscribe(settings_key()).await?;

    if let Some(value) = profile_sub.initial() {
        apply_user_push(&store, &user_slot, value).await;
    }
    if let Some(value) = settings_sub.initial() {
        apply_settings_push(&store, &settings_slot, value).await;
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                push = profile_sub.recv() => {
                    let Some(value) = push else { break };
                    apply_user_push(&store, &user_slot, value).await;
                }
                push = settings_sub.recv() => {
                    let Some(value) = push else { break };
                    apply_settings_push(&store, &settings_slot, value).await;
                }
            }
        }
    });

    Ok(ReconcilerHandle {
        shutdown: shutdown_tx,
        task,
    })
}

/// Remote wins: overwrite the in-memory snapshot and the local cache entry.
/// Nothing here ever writes back to the remote store — that would turn an
/// echo into a loop.
async fn apply_user_push(store: &DualStore, slot: &RwLock<User>, value: Value) {
    let current = slot.read().await.clone();
    match merge_remote_user(&current, value) {
        MergeOutcome::Replaced(user) => {
            match serde_json::to_value(&user) {
                Ok(encoded) => {
                    if let Err(err) = store.local().put(&user_key(&user.id), encoded).await {
                        warn!(error = %err, "local cache overwrite failed during reconcile");
                    }
                }
                Err(err) => warn!(error = %err, "re-encode of remote user push failed"),
            }
            info!(user_id = %user.id, "profile reconciled from remote");
            *slot.write().await = user;
        }
        MergeOutcome::Unchanged => {}
        MergeOutcome::Undecodable => {
            warn!("ignoring undecodable remote profile push");
        }
    }
}

async fn apply_settings_push(store: &DualStore, slot: &RwLock<SystemSettings>, value: Value) {
    let current = slot.read().await.clone();
    match merge_remote_settings(&current, value.clone()) {
        MergeOutcome::Replaced(settings) => {
            if let Err(err) = store.local().put(settings_key(), value).await {
                warn!(error = %err, "local settings overwrite failed during reconcile");
            }
            let hash = settings_hash(&settings).unwrap_or_default();
            info!(%hash, "settings reconciled from remote");
            *slot.write().await = settings;
        }
        MergeOutcome::Unchanged => {}
        MergeOutcome::Undecodable => {
            warn!("ignoring undecodable remote settings push");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
