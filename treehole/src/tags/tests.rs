// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;
use treehole_core::{Tag, TagNameError};
use treehole_store::{SqliteStore, TagStore, Transaction};

use crate::cache::{Cache, CacheError, MemoryCache, get_json};
use crate::test_utils::setup_logging;

use super::{TAGS_CACHE_KEY, TagError, TagService};

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn sorted_names(tags: &[Tag]) -> Vec<String> {
    let mut names: Vec<String> = tags.iter().map(|tag| tag.name.clone()).collect();
    names.sort();
    names
}

fn service<C: Cache>(store: &SqliteStore<'static>, cache: C) -> TagService {
    TagService::spawn(store.clone(), cache, Duration::from_secs(5), Duration::ZERO)
}

/// Cache which is never reachable.
#[derive(Clone)]
struct UnavailableCache;

impl Cache for UnavailableCache {
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// Polls the cache until the tag listing shows up.
async fn cached_tags(cache: &MemoryCache) -> Vec<Tag> {
    for _ in 0..100 {
        if let Some(tags) = get_json::<_, Vec<Tag>>(cache, TAGS_CACHE_KEY).await.unwrap() {
            return tags;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tag cache was never refreshed");
}

#[tokio::test]
async fn create_missing_tags() {
    setup_logging();
    let store = SqliteStore::temporary().await;
    let tags = service(&store, MemoryCache::new());

    let first = tags.find_or_create(&names(&["a"]), None).await.unwrap();
    assert_eq!(sorted_names(&first), names(&["a"]));
    assert_eq!(first[0].temperature, 0);

    // "a" exists already, only "b" gets created.
    let second = tags.find_or_create(&names(&["a", "b"]), None).await.unwrap();
    assert_eq!(sorted_names(&second), names(&["a", "b"]));
    let a = second.iter().find(|tag| tag.name == "a").unwrap();
    assert_eq!(a, &first[0]);

    // "a" is stored unchanged.
    let stored = store.tags_by_temperature().await.unwrap();
    let stored_a = stored.iter().find(|tag| tag.name == "a").unwrap();
    assert_eq!(stored_a, &first[0]);
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn duplicate_and_empty_requests() {
    let store = SqliteStore::temporary().await;
    let tags = service(&store, MemoryCache::new());

    let result = tags
        .find_or_create(&names(&["rust", "rust", "go"]), None)
        .await
        .unwrap();
    assert_eq!(sorted_names(&result), names(&["go", "rust"]));

    let result = tags.find_or_create(&[], None).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn concurrent_creation_yields_single_tag() {
    let store = SqliteStore::temporary().await;
    let tags = service(&store, MemoryCache::new());

    let requests = (0..8).map(|_| {
        let tags = tags.clone();
        async move { tags.find_or_create(&names(&["x"]), None).await }
    });
    let results = join_all(requests).await;

    let mut ids = Vec::new();
    for result in results {
        let result = result.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "x");
        ids.push(result[0].id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    assert_eq!(store.tags_by_temperature().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creation_on_spawned_tasks() {
    let store = SqliteStore::temporary().await;
    let tags = service(&store, MemoryCache::new());

    // Overlapping name sets requested from parallel tasks.
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tags = tags.clone();
            let request = if i % 2 == 0 {
                names(&["x", "y"])
            } else {
                names(&["y", "z"])
            };
            tokio::spawn(async move { tags.find_or_create(&request, None).await })
        })
        .collect();

    let mut ids_by_name = std::collections::HashMap::new();
    for handle in handles {
        for tag in handle.await.unwrap().unwrap() {
            let id = *ids_by_name.entry(tag.name.clone()).or_insert(tag.id);
            assert_eq!(id, tag.id);
        }
    }
    assert_eq!(ids_by_name.len(), 3);

    let stored = store.tags_by_temperature().await.unwrap();
    assert_eq!(sorted_names(&stored), names(&["x", "y", "z"]));
}

#[tokio::test]
async fn reject_invalid_names() {
    let store = SqliteStore::temporary().await;
    let tags = service(&store, MemoryCache::new());

    let result = tags.find_or_create(&names(&["ok", " "]), None).await;
    assert!(matches!(
        result,
        Err(TagError::InvalidName(TagNameError::Empty))
    ));

    let long = "x".repeat(33);
    let result = tags.find_or_create(&[long], None).await;
    assert!(matches!(
        result,
        Err(TagError::InvalidName(TagNameError::TooLong(33, 32)))
    ));

    // Nothing got created, also not the valid name.
    assert!(store.tags_by_temperature().await.unwrap().is_empty());
}

#[tokio::test]
async fn refresh_cache_after_creation() {
    let store = SqliteStore::temporary().await;
    let cache = MemoryCache::new();
    let tags = service(&store, cache.clone());

    tags.find_or_create(&names(&["b", "a"]), None).await.unwrap();

    let cached = cached_tags(&cache).await;
    assert_eq!(sorted_names(&cached), names(&["a", "b"]));
}

#[tokio::test]
async fn refresh_cache_now() {
    let store = SqliteStore::temporary().await;
    let cache = MemoryCache::new();
    let tags = service(&store, MemoryCache::new());

    let permit = store.begin().await.unwrap();
    store
        .insert_tags_if_absent(&names(&["c", "d"]))
        .await
        .unwrap();
    store.commit(permit).await.unwrap();

    tags.refresh_cache_now(&cache, Duration::ZERO).await.unwrap();
    let cached: Vec<Tag> = get_json(&cache, TAGS_CACHE_KEY).await.unwrap().unwrap();
    assert_eq!(sorted_names(&cached), names(&["c", "d"]));

    assert!(
        tags.refresh_cache_now(&UnavailableCache, Duration::ZERO)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn unavailable_cache_does_not_fail_creation() {
    let store = SqliteStore::temporary().await;
    let tags = service(&store, UnavailableCache);

    let result = tags.find_or_create(&names(&["a"]), None).await.unwrap();
    assert_eq!(sorted_names(&result), names(&["a"]));

    // Give the refresher a chance to run into the unavailable cache.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = tags.find_or_create(&names(&["a", "b"]), None).await.unwrap();
    assert_eq!(sorted_names(&result), names(&["a", "b"]));
}

#[tokio::test]
async fn lock_timeout() {
    let store = SqliteStore::temporary().await;
    let tags = service(&store, MemoryCache::new());

    let permit = store.begin().await.unwrap();

    let deadline = Instant::now() + Duration::from_millis(20);
    let result = tags.find_or_create(&names(&["late"]), Some(deadline)).await;
    assert!(matches!(result, Err(TagError::LockTimeout(_))));

    store.rollback(permit).await.unwrap();
    assert!(store.tags_by_temperature().await.unwrap().is_empty());
}
