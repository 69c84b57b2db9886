use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use astrocache::persist::codec;
use astrocache::{ResourceCache, ResourceCacheBuilder, TaskError};

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
struct UpstreamDown;

fn cache() -> ResourceCache<i32> {
    ResourceCache::new(5)
}

#[test]
fn insert_and_get() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    assert_eq!(cache.get("key1"), Some(1));
}

#[test]
fn contains_respects_presence() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    assert!(cache.contains("key1"));
    assert!(!cache.contains("key2"));
}

#[test]
fn contains_removes_an_expired_entry() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_millis(50)));
    thread::sleep(Duration::from_millis(150));
    assert!(!cache.contains("key1"));
    assert_eq!(cache.size(), 0);
}

#[test]
fn remove_drops_the_entry() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.remove("key1");
    assert!(!cache.contains("key1"));
}

#[test]
fn async_get_returns_the_value() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    let future = cache.async_get("key1");
    assert_eq!(future.wait().unwrap(), Some(1));
}

#[test]
fn async_insert_completes_and_stores() {
    let cache = cache();
    let future = cache.async_insert("key1", 1, Some(Duration::from_secs(10)));
    future.wait().unwrap();
    assert!(cache.contains("key1"));
}

#[test]
fn async_load_inserts_the_loaded_value() {
    let cache = cache();
    let future = cache.async_load("key1", || Ok::<_, UpstreamDown>(1));
    future.wait().unwrap();
    assert!(cache.contains("key1"));
    assert_eq!(cache.get("key1"), Some(1));
}

#[test]
fn async_load_failure_inserts_nothing() {
    let cache = cache();
    let future = cache.async_load("key1", || Err::<i32, _>(UpstreamDown));
    assert!(matches!(future.wait(), Err(TaskError::Failed(_))));
    assert!(!cache.contains("key1"));
}

#[test]
fn async_load_applies_the_default_ttl() {
    let cache = ResourceCacheBuilder::new()
        .max_size(5)
        .default_ttl(Duration::from_millis(50))
        .build::<i32>();
    cache
        .async_load("key1", || Ok::<_, UpstreamDown>(1))
        .wait()
        .unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(cache.is_expired("key1"));
}

#[test]
fn async_load_prefers_the_key_override() {
    let cache = ResourceCacheBuilder::new()
        .max_size(5)
        .default_ttl(Duration::from_millis(50))
        .build::<i32>();
    cache.insert("key1", 0, None);
    cache.set_expiration_time("key1", Duration::from_secs(60));
    cache
        .async_load("key1", || Ok::<_, UpstreamDown>(1))
        .wait()
        .unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(!cache.is_expired("key1"));
    assert_eq!(cache.get("key1"), Some(1));
}

#[test]
fn clear_empties_but_keeps_statistics() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.get("key1");
    cache.get("missing");
    cache.clear();
    assert!(!cache.contains("key1"));
    assert!(cache.is_empty());
    assert_eq!(cache.statistics(), (1, 1));
}

#[test]
fn size_counts_entries() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.insert("key2", 2, Some(Duration::from_secs(10)));
    assert_eq!(cache.size(), 2);
}

#[test]
fn empty_flips_on_first_insert() {
    let cache = cache();
    assert!(cache.is_empty());
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    assert!(!cache.is_empty());
}

#[test]
fn overflow_evicts_the_oldest_insertion() {
    let cache = cache();
    for (index, key) in ["key1", "key2", "key3", "key4", "key5", "key6"]
        .iter()
        .enumerate()
    {
        cache.insert(*key, index as i32, Some(Duration::from_secs(10)));
    }
    assert!(!cache.contains("key1"));
    assert!(cache.contains("key6"));
    assert_eq!(cache.size(), 5);
}

#[test]
fn evict_oldest_ignores_access_recency() {
    let cache = cache();
    cache.insert("old", 1, None);
    cache.insert("new", 2, None);
    // Reading the oldest entry does not protect it.
    assert_eq!(cache.get("old"), Some(1));
    cache.evict_oldest();
    assert!(!cache.contains("old"));
    assert!(cache.contains("new"));
}

#[test]
fn is_expired_after_the_deadline() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_millis(50)));
    thread::sleep(Duration::from_millis(150));
    assert!(cache.is_expired("key1"));
}

#[test]
fn set_max_size_shrinks_by_insertion_order() {
    let cache = cache();
    cache.set_max_size(2);
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.insert("key2", 2, Some(Duration::from_secs(10)));
    cache.insert("key3", 3, Some(Duration::from_secs(10)));
    assert!(!cache.contains("key1"));
    assert!(cache.contains("key3"));
    assert_eq!(cache.size(), 2);
}

#[test]
fn set_expiration_time_moves_the_deadline() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.set_expiration_time("key1", Duration::from_millis(50));
    thread::sleep(Duration::from_millis(150));
    assert!(cache.is_expired("key1"));
}

#[test]
fn remove_expired_sweeps_and_notifies() {
    let cache = cache();
    let removed = Arc::new(AtomicUsize::new(0));
    let counter = removed.clone();
    cache.on_remove(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    cache.insert("short1", 1, Some(Duration::from_millis(50)));
    cache.insert("short2", 2, Some(Duration::from_millis(50)));
    cache.insert("long", 3, Some(Duration::from_secs(60)));
    thread::sleep(Duration::from_millis(150));
    cache.remove_expired();
    assert_eq!(cache.size(), 1);
    assert!(cache.contains("long"));
    assert_eq!(removed.load(Ordering::SeqCst), 2);
}

#[test]
fn insert_batch_stores_every_item() {
    let cache = cache();
    let inserted = Arc::new(AtomicUsize::new(0));
    let counter = inserted.clone();
    cache.on_insert(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    cache.insert_batch(
        vec![("key1".to_string(), 1), ("key2".to_string(), 2)],
        Some(Duration::from_secs(10)),
    );
    assert!(cache.contains("key1"));
    assert!(cache.contains("key2"));
    assert_eq!(inserted.load(Ordering::SeqCst), 2);
}

#[test]
fn remove_batch_ignores_absent_keys() {
    let cache = cache();
    let removed = Arc::new(AtomicUsize::new(0));
    let counter = removed.clone();
    cache.on_remove(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.insert("key2", 2, Some(Duration::from_secs(10)));
    cache.remove_batch(&[
        "key1".to_string(),
        "key2".to_string(),
        "missing".to_string(),
    ]);
    assert!(!cache.contains("key1"));
    assert!(!cache.contains("key2"));
    assert_eq!(removed.load(Ordering::SeqCst), 2);
}

#[test]
fn statistics_track_get_outcomes() {
    let cache = cache();
    cache.insert("key1", 1, Some(Duration::from_secs(10)));
    cache.get("key1");
    cache.get("key2");
    assert_eq!(cache.statistics(), (1, 1));
}

#[test]
fn insert_callback_fires_outside_the_lock() {
    let cache = cache();
    let reentered = Arc::new(AtomicBool::new(false));
    let probe = cache.clone();
    let observed = reentered.clone();
    cache.on_insert(move |key, _| {
        // Reentering the cache from a callback must not deadlock.
        let _ = probe.size();
        assert_eq!(key, "key1");
        observed.store(true, Ordering::SeqCst);
    });
    cache.insert("key1", 1, None);
    assert!(reentered.load(Ordering::SeqCst));
}

#[test]
fn json_snapshot_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");

    let cache: ResourceCache<String> = ResourceCache::new(10);
    cache.insert("k1", "v1".to_string(), Some(Duration::from_secs(60)));
    cache.insert("k2", "v2".to_string(), Some(Duration::from_secs(60)));
    cache
        .write_to_json_file(&path, |value| {
            Ok::<_, std::convert::Infallible>(serde_json::Value::String(value.clone()))
        })
        .unwrap();
    cache.clear();

    cache
        .read_from_json_file(&path, |value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or(UpstreamDown)
        })
        .unwrap();
    assert!(cache.contains("k1"));
    assert!(cache.contains("k2"));
    assert_eq!(cache.size(), 2);
    assert_eq!(cache.get("k1"), Some("v1".to_string()));
}

#[test]
fn json_snapshot_preserves_never_expiring_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.json");

    let cache: ResourceCache<i32> = ResourceCache::new(10);
    cache.insert("eternal", 1, None);
    cache
        .write_to_json_file(&path, |value| {
            Ok::<_, std::convert::Infallible>(serde_json::json!(value))
        })
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["eternal"]["expiry_ms"], serde_json::json!(-1));

    cache.clear();
    cache
        .read_from_json_file(&path, |value| {
            value.as_i64().map(|v| v as i32).ok_or(UpstreamDown)
        })
        .unwrap();
    assert!(!cache.is_expired("eternal"));
    assert_eq!(cache.get("eternal"), Some(1));
}

#[test]
fn binary_snapshot_round_trips_with_the_codec() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("values.bin");

    let cache: ResourceCache<i32> = ResourceCache::new(10);
    cache.insert("key1", 7, None);
    cache.insert("key2", 11, None);
    cache
        .write_to_file(&path, |value| codec::encode(value))
        .unwrap();
    cache.clear();

    cache
        .read_from_file(&path, |bytes| codec::decode(bytes))
        .unwrap();
    assert_eq!(cache.size(), 2);
    assert_eq!(cache.get("key1"), Some(7));
    assert_eq!(cache.get("key2"), Some(11));
}

#[test]
fn read_merge_overwrites_existing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merge.bin");

    let source: ResourceCache<i32> = ResourceCache::new(10);
    source.insert("key1", 100, None);
    source
        .write_to_file(&path, |value| codec::encode(value))
        .unwrap();

    let target: ResourceCache<i32> = ResourceCache::new(10);
    target.insert("key1", 1, None);
    target.insert("key2", 2, None);
    target
        .read_from_file(&path, |bytes| codec::decode(bytes))
        .unwrap();
    assert_eq!(target.get("key1"), Some(100));
    assert_eq!(target.get("key2"), Some(2));
    assert_eq!(target.size(), 2);
}

#[test]
fn serializer_failure_leaves_the_file_unwritten_and_cache_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failed.bin");

    let cache: ResourceCache<i32> = ResourceCache::new(10);
    cache.insert("key1", 1, None);
    let result = cache.write_to_file(&path, |_| Err::<Vec<u8>, _>(UpstreamDown));
    assert!(result.is_err());
    assert!(!path.exists());
    assert_eq!(cache.get("key1"), Some(1));
}
