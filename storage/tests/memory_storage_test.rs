//! Integration tests for [`storage::MemoryStorage`] through the [`dbot_core::Storage`] contract.
//!
//! Covers clear(), opaque data round trip, and concurrent writers from detached tasks.

use dbot_core::{StateData, Storage};
use serde_json::json;
use std::sync::Arc;
use storage::MemoryStorage;

/// **Test: clear() drops every record.**
///
/// **Setup:** State for three conversations.
/// **Action:** `clear()`.
/// **Expected:** Store is empty; reads return the empty sentinels.
#[tokio::test]
async fn test_clear_wipes_all_records() {
    let store = MemoryStorage::new();
    for id in 1..=3 {
        store.set_state(id, id, "busy").await.unwrap();
    }
    assert_eq!(store.len().await, 3);

    store.clear().await.unwrap();

    assert!(store.is_empty().await);
    assert_eq!(store.get_state(1, 1).await.unwrap(), "");
}

/// **Test: Data blob is stored opaquely.**
///
/// **Setup:** Nested JSON values of mixed types.
/// **Action:** `set_data` then `get_data`.
/// **Expected:** Exactly the same map comes back.
#[tokio::test]
async fn test_data_blob_is_returned_unchanged() {
    let store = MemoryStorage::new();
    let mut data = StateData::new();
    data.insert("step".to_string(), json!(3));
    data.insert("answers".to_string(), json!({"age": 30, "tags": ["a", "b"]}));
    data.insert("done".to_string(), json!(null));

    store.set_data(10, 20, data.clone()).await.unwrap();

    assert_eq!(store.get_data(10, 20).await.unwrap(), data);
    assert_eq!(store.get_state(10, 20).await.unwrap(), "");
}

/// **Test: Concurrent writers from detached tasks.**
///
/// **Setup:** Store shared as `Arc<dyn Storage>` across 50 spawned tasks.
/// **Action:** Each task writes its own conversation's state.
/// **Expected:** All 50 records present with their own labels.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_from_many_tasks() {
    let concrete = MemoryStorage::new();
    let store: Arc<dyn Storage> = Arc::new(concrete.clone());

    let mut tasks = Vec::new();
    for id in 0..50i64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.set_state(id, id, &format!("s{}", id)).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(concrete.len().await, 50);
    assert_eq!(store.get_state(42, 42).await.unwrap(), "s42");
}
