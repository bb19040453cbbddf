use std::thread::sleep;

use serde_json::json;

use super::*;

fn nodes(value: Value) -> CachedDict {
    CachedDict::Nodes(value)
}

fn nodes_value(cached: Option<CachedDict>) -> Option<Value> {
    match cached {
        Some(CachedDict::Nodes(value)) => Some(value),
        _ => None,
    }
}

#[test]
fn set_then_get_returns_value() {
    let cache = DictCache::new(10, 10, Duration::from_secs(60));
    assert!(cache.get("/api/colors").is_none());

    cache.set("/api/colors", nodes(json!([{"value": 1}])));

    assert_eq!(
        nodes_value(cache.get("/api/colors")),
        Some(json!([{"value": 1}]))
    );
    assert_eq!(cache.len(), 1);
}

#[test]
fn expired_entries_are_treated_as_absent() {
    let cache = DictCache::new(10, 10, Duration::from_millis(40));
    cache.set("k", nodes(json!([])));
    assert!(cache.get("k").is_some());

    sleep(Duration::from_millis(80));

    assert!(cache.get("k").is_none());
    assert!(cache.is_empty());
}

#[test]
fn set_resets_ttl() {
    let cache = DictCache::new(10, 10, Duration::from_millis(120));
    cache.set("k", nodes(json!(1)));
    sleep(Duration::from_millis(70));
    cache.set("k", nodes(json!(2)));
    sleep(Duration::from_millis(70));

    assert_eq!(nodes_value(cache.get("k")), Some(json!(2)));
}

#[test]
fn evicts_least_recently_used_when_entry_count_exceeded() {
    let cache = DictCache::new(2, 100, Duration::from_secs(60));
    cache.set("a", nodes(json!("a")));
    cache.set("b", nodes(json!("b")));

    // Touch "a" so "b" becomes the eviction candidate.
    assert!(cache.get("a").is_some());
    cache.set("c", nodes(json!("c")));

    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());
    assert!(cache.get("c").is_some());
    assert_eq!(cache.len(), 2);
}

#[test]
fn evicts_when_aggregate_size_exceeded() {
    let cache = DictCache::new(100, 3, Duration::from_secs(60));
    for key in ["a", "b", "c", "d"] {
        cache.set(key, nodes(json!(key)));
    }

    assert_eq!(cache.len(), 3);
    assert!(cache.get("a").is_none());
    assert!(cache.get("d").is_some());
}

#[test]
fn replacing_a_key_does_not_grow_the_cache() {
    let cache = DictCache::new(100, 2, Duration::from_secs(60));
    cache.set("a", nodes(json!(1)));
    cache.set("a", nodes(json!(2)));
    cache.set("b", nodes(json!(3)));

    assert_eq!(cache.len(), 2);
    assert_eq!(nodes_value(cache.get("a")), Some(json!(2)));
}

#[test]
fn get_or_insert_with_only_creates_once() {
    let cache = DictCache::default();

    let (_, created) = cache.get_or_insert_with("/api/x", || {
        CachedDict::Remote(Arc::new(Mutex::new(RemoteRecord::started())))
    });
    assert!(created);

    let (existing, created) = cache.get_or_insert_with("/api/x", || nodes(json!([])));
    assert!(!created);
    match existing {
        CachedDict::Remote(record) => assert!(record.lock().is_loading()),
        CachedDict::Nodes(_) => panic!("expected the remote record"),
    }
}

#[test]
fn remove_and_clear() {
    let cache = DictCache::default();
    cache.set("a", nodes(json!(1)));
    cache.set("b", nodes(json!(2)));

    assert!(cache.remove("a").is_some());
    assert!(cache.remove("a").is_none());
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn global_cache_is_shared() {
    let first = DictCache::global();
    let second = DictCache::global();
    assert!(Arc::ptr_eq(&first, &second));
}
