use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::backend::{StoreBackend, StoreError};

// ---------------------------------------------------------------------------
// Watch handle
// ---------------------------------------------------------------------------

/// Scoped handle for a remote change listener.
///
/// Owns the receiver; dropping the handle releases the listener. The
/// initial value (remote snapshot, or the one-shot local fallback when the
/// remote has no document yet) is delivered through [`WatchHandle::initial`]
/// exactly once — after that only live remote pushes arrive via
/// [`WatchHandle::recv`].
pub struct WatchHandle {
    key: String,
    initial: Option<Value>,
    rx: broadcast::Receiver<Value>,
}

impl WatchHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Take the initial value, if any. Subsequent calls return `None`.
    pub fn initial(&mut self) -> Option<Value> {
        self.initial.take()
    }

    /// Wait for the next remote push. `None` when the stream is closed.
    /// Lagged receivers skip to the freshest value — last write wins, so
    /// intermediate snapshots carry no information worth replaying.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DualStore
// ---------------------------------------------------------------------------

/// Read-through/write-through layer over the local durable cache and the
/// remote synchronized store. See the crate docs for the consistency model.
pub struct DualStore {
    local: Arc<dyn StoreBackend>,
    remote: Arc<dyn StoreBackend>,
    remote_failures: Arc<AtomicU64>,
}

impl DualStore {
    pub fn new(local: Arc<dyn StoreBackend>, remote: Arc<dyn StoreBackend>) -> Self {
        Self {
            local,
            remote,
            remote_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Write to the local cache, then propagate to the remote store in the
    /// background. The local write decides the call's outcome; remote
    /// failures are logged and counted, never surfaced — they only delay
    /// cross-device convergence.
    pub async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.local.put(key, value.clone()).await?;
        self.spawn_remote_put(key, value);
        Ok(())
    }

    /// Write only the local cache. For high-frequency counters (per-second
    /// activity ticks) that need crash durability but not convergence; the
    /// owning flow publishes a consolidated snapshot on its own cadence.
    pub async fn write_local(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.local.put(key, value).await
    }

    /// Fire-and-forget push to the remote store only, bypassing the cache.
    /// Used for liveness beacons: state the local tier has no use for.
    pub fn push_remote(&self, key: &str, value: Value) {
        self.spawn_remote_put(key, value);
    }

    /// Local-first read with remote fallback. A value found only remotely is
    /// **not** written back into the cache.
    pub async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if let Some(value) = self.local.get(key).await? {
            return Ok(Some(value));
        }
        self.remote.get(key).await
    }

    /// Remove from the local cache, then best-effort from the remote store.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.local.remove(key).await?;
        let remote = Arc::clone(&self.remote);
        let failures = Arc::clone(&self.remote_failures);
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(err) = remote.remove(&key).await {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %err, "remote remove failed; will diverge until next write");
            }
        });
        Ok(())
    }

    /// Listen for remote changes to `key`.
    ///
    /// The initial value comes from the remote store when present; otherwise
    /// one fallback read of the local cache supplies it, and no continuous
    /// dual subscription is kept.
    pub async fn subscribe(&self, key: &str) -> Result<WatchHandle, StoreError> {
        let rx = self.remote.watch(key)?;
        let initial = match self.remote.get(key).await? {
            Some(value) => Some(value),
            None => self.local.get(key).await?,
        };
        Ok(WatchHandle {
            key: key.to_string(),
            initial,
            rx,
        })
    }

    /// Remote propagation failures observed so far (monotonic).
    pub fn remote_failure_count(&self) -> u64 {
        self.remote_failures.load(Ordering::Relaxed)
    }

    /// Direct handle to the local tier, for reconciliation overwrites that
    /// must not echo back to the remote store.
    pub fn local(&self) -> &Arc<dyn StoreBackend> {
        &self.local
    }

    /// Direct handle to the remote tier (test assertions, admin tooling).
    pub fn remote(&self) -> &Arc<dyn StoreBackend> {
        &self.remote
    }

    fn spawn_remote_put(&self, key: &str, value: Value) {
        let remote = Arc::clone(&self.remote);
        let failures = Arc::clone(&self.remote_failures);
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(err) = remote.put(&key, value).await {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    key = %key,
                    error = %err,
                    "remote propagation failed; local cache remains authoritative"
                );
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
