//! Scenario: `write(k, v)` followed immediately by `read(k)` returns `v`
//! from the local cache with no dependency on remote propagation — including
//! when the remote store is down for the whole session.
//!
//! Also exercises the on-disk cache tier: a crash/restart reloads exactly
//! what the last local write committed.

use std::sync::Arc;

use serde_json::json;

use lgk_store::{DualStore, JsonFileStore, MemoryStore, StoreBackend};
use lgk_testkit::{memory_dual_store, settle};

#[tokio::test]
async fn write_then_read_ignores_remote_health() {
    let (store, _local, remote) = memory_dual_store();
    remote.set_fail_writes(true);

    for i in 0..10 {
        let key = format!("record:{i}");
        store.write(&key, json!({ "i": i })).await.unwrap();
        assert_eq!(store.read(&key).await.unwrap(), Some(json!({ "i": i })));
    }
    settle().await;

    // Every propagation failed silently; reads kept working.
    assert_eq!(store.remote_failure_count(), 10);
    assert!(remote.is_empty());
}

#[tokio::test]
async fn durable_cache_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MemoryStore::new("remote"));
    remote.set_fail_writes(true); // remote never saw anything

    {
        let local = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let store = DualStore::new(local, remote.clone());
        store
            .write("user:u-1", json!({ "credits": 7 }))
            .await
            .unwrap();
        settle().await;
    }

    // New process: the local cache is the source of truth.
    let local = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let store = DualStore::new(local, remote);
    assert_eq!(
        store.read("user:u-1").await.unwrap(),
        Some(json!({ "credits": 7 }))
    );
}

#[tokio::test]
async fn subscribe_serves_cached_initial_value_when_remote_is_empty() {
    let (store, _local, _remote) = memory_dual_store();
    store.write_local("settings", json!({ "theme": "dark" })).await.unwrap();

    let mut sub = store.subscribe("settings").await.unwrap();
    assert_eq!(sub.initial(), Some(json!({ "theme": "dark" })));
}

#[tokio::test]
async fn remote_only_records_are_not_promoted_into_the_cache() {
    let (store, local, remote) = memory_dual_store();
    remote.put("catalog:x", json!({ "price": 5 })).await.unwrap();

    assert_eq!(
        store.read("catalog:x").await.unwrap(),
        Some(json!({ "price": 5 }))
    );
    assert_eq!(
        local.get("catalog:x").await.unwrap(),
        None,
        "fallback reads must not silently populate the cache"
    );

    // An explicit re-write is the sanctioned way to gain locality.
    store.write("catalog:x", json!({ "price": 5 })).await.unwrap();
    assert_eq!(local.get("catalog:x").await.unwrap(), Some(json!({ "price": 5 })));
}

#[tokio::test]
async fn whole_record_last_write_wins() {
    let (store, _local, _remote) = memory_dual_store();
    store
        .write("user:u-1", json!({ "credits": 5, "name": "Asha" }))
        .await
        .unwrap();
    // A later writer replaces the record wholesale — no field merge.
    store.write("user:u-1", json!({ "credits": 9 })).await.unwrap();

    assert_eq!(
        store.read("user:u-1").await.unwrap(),
        Some(json!({ "credits": 9 }))
    );
}
