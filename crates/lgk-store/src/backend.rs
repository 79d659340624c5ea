use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures a store backend can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying IO failed (disk, transport).
    Io(String),
    /// A stored value could not be encoded or decoded.
    Encode(String),
    /// The backend does not support change listeners.
    WatchUnsupported,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "store io error: {msg}"),
            StoreError::Encode(msg) => write!(f, "store encode error: {msg}"),
            StoreError::WatchUnsupported => write!(f, "store backend does not support watch"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// One tier of the dual store: plain key → JSON-value records.
///
/// Object-safe so the sync layer can hold `Arc<dyn StoreBackend>` without
/// knowing the concrete tier.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Human-readable tier name for log lines (e.g. `"local-cache"`).
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Attach a change listener for `key`. Backends without change streams
    /// return `Err(WatchUnsupported)`; the default does exactly that.
    fn watch(&self, key: &str) -> Result<broadcast::Receiver<Value>, StoreError> {
        let _ = key;
        Err(StoreError::WatchUnsupported)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process backend with change streams.
///
/// Stands in for the remote synchronized store in tests and embedded setups.
/// `set_fail_writes(true)` makes every `put`/`remove` fail, for exercising
/// the propagation-failure path.
pub struct MemoryStore {
    name: &'static str,
    records: Mutex<BTreeMap<String, Value>>,
    watchers: Mutex<BTreeMap<String, broadcast::Sender<Value>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            records: Mutex::new(BTreeMap::new()),
            watchers: Mutex::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Toggle write-failure injection.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.lock().expect("records lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, key: &str, value: &Value) {
        let watchers = self.watchers.lock().expect("watchers lock");
        if let Some(tx) = watchers.get(key) {
            // No receivers is fine; watchers may come and go.
            let _ = tx.send(value.clone());
        }
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.records.lock().expect("records lock").get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("{}: injected write failure", self.name)));
        }
        self.records
            .lock()
            .expect("records lock")
            .insert(key.to_string(), value.clone());
        self.notify(key, &value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("{}: injected write failure", self.name)));
        }
        self.records.lock().expect("records lock").remove(key);
        Ok(())
    }

    fn watch(&self, key: &str) -> Result<broadcast::Receiver<Value>, StoreError> {
        let mut watchers = self.watchers.lock().expect("watchers lock");
        let tx = watchers
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(64).0);
        Ok(tx.subscribe())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Local durable cache: one JSON file per key under a root directory.
///
/// Writes go through a temp-file rename so a crash mid-write never leaves a
/// torn record; the cache is the recovery source of truth on next load.
/// No change streams — local mutations all originate in this process.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create the store, ensuring the root directory exists.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| StoreError::Io(format!("create_dir_all {root:?}: {e}")))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

/// Injective key → file-name encoding: bytes outside `[A-Za-z0-9._-]`
/// become `%XX`. `%` itself is escaped, so decoding is unambiguous.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[async_trait]
impl StoreBackend for JsonFileStore {
    fn name(&self) -> &'static str {
        "local-cache"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(format!("read {path:?}: {e}"))),
        };
        let value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Encode(format!("decode {path:?}: {e}")))?;
        Ok(Some(value))
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let raw = serde_json::to_string(&value)
            .map_err(|e| StoreError::Encode(format!("encode {key}: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(|e| StoreError::Io(format!("write {tmp:?}: {e}")))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| StoreError::Io(format!("rename {tmp:?} -> {path:?}: {e}")))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(format!("remove {path:?}: {e}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
