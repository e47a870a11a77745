// SPDX-License-Identifier: MIT OR Apache-2.0

use sqlx::query;

use crate::SqliteStore;
use crate::tags::TagStore;
use crate::traits::Transaction;

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn insert_if_absent_and_query() {
    let store = SqliteStore::temporary().await;

    let permit = store.begin().await.unwrap();

    assert_eq!(
        store.insert_tags_if_absent(&names(&["a", "b"])).await.unwrap(),
        2
    );
    // "a" exists already, only "c" gets inserted. Duplicates in the input collapse as well.
    assert_eq!(
        store
            .insert_tags_if_absent(&names(&["a", "c", "c"]))
            .await
            .unwrap(),
        1
    );

    let mut tags = store
        .tags_by_names(&names(&["a", "c", "unknown"]))
        .await
        .unwrap();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "a");
    assert_eq!(tags[1].name, "c");
    assert!(tags.iter().all(|tag| tag.temperature == 0));

    assert!(store.tags_by_names(&[]).await.unwrap().is_empty());

    store.commit(permit).await.unwrap();

    assert_eq!(store.tags_by_temperature().await.unwrap().len(), 3);
}

#[tokio::test]
async fn ids_are_stable() {
    let store = SqliteStore::temporary().await;

    let permit = store.begin().await.unwrap();
    store.insert_tags_if_absent(&names(&["x"])).await.unwrap();
    let first = store.tags_by_names(&names(&["x"])).await.unwrap();
    store.insert_tags_if_absent(&names(&["x"])).await.unwrap();
    let second = store.tags_by_names(&names(&["x"])).await.unwrap();
    store.commit(permit).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn ordered_by_temperature() {
    let store = SqliteStore::temporary().await;

    let permit = store.begin().await.unwrap();
    store
        .insert_tags_if_absent(&names(&["cold", "hot", "warm"]))
        .await
        .unwrap();
    store
        .tx(async |tx| {
            query("UPDATE tags_v1 SET temperature = 10 WHERE name = 'hot'")
                .execute(&mut **tx)
                .await?;
            query("UPDATE tags_v1 SET temperature = 5 WHERE name = 'warm'")
                .execute(&mut **tx)
                .await?;
            Ok(())
        })
        .await
        .unwrap();
    store.commit(permit).await.unwrap();

    let tags = store.tags_by_temperature().await.unwrap();
    let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["hot", "warm", "cold"]);
}
