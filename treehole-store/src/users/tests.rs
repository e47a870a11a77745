// SPDX-License-Identifier: MIT OR Apache-2.0

use treehole_core::{BanDivision, ShowFolded, User, UserConfig};

use crate::SqliteStore;
use crate::sqlite::SqliteError;
use crate::traits::Transaction;
use crate::users::UserStore;

#[tokio::test]
async fn insert_and_load_user() {
    let store = SqliteStore::temporary().await;

    let mut user = User::new(42);
    user.config.show_folded = ShowFolded::Hide;
    user.ban_division = BanDivision::from([(1, Some(1_000)), (2, None)]);

    let permit = store.begin().await.unwrap();

    assert!(store.insert_user(&user).await.unwrap());
    // Inserting the same id again is ignored.
    assert!(!store.insert_user(&User::new(42)).await.unwrap());

    // Uncommitted record is visible within the transaction.
    assert_eq!(store.user_for_update(42).await.unwrap(), Some(user.clone()));
    assert_eq!(store.user_for_update(7).await.unwrap(), None);

    store.commit(permit).await.unwrap();

    assert_eq!(store.get_user(42).await.unwrap(), Some(user));
    assert_eq!(store.get_user(7).await.unwrap(), None);
}

#[tokio::test]
async fn update_only_ban_division() {
    let store = SqliteStore::temporary().await;

    let mut user = User::new(3);
    user.offence_count = 2;
    user.config = UserConfig {
        notify: vec!["mention".into()],
        show_folded: ShowFolded::Show,
    };

    let permit = store.begin().await.unwrap();
    store.insert_user(&user).await.unwrap();
    store.commit(permit).await.unwrap();

    let ban_division = BanDivision::from([(9, Some(500))]);

    let permit = store.begin().await.unwrap();
    assert!(store.update_ban_division(3, &ban_division).await.unwrap());
    // Unknown users are not created by updates.
    assert!(!store.update_ban_division(4, &ban_division).await.unwrap());
    store.commit(permit).await.unwrap();

    let stored = store.get_user(3).await.unwrap().unwrap();
    assert_eq!(stored.ban_division, ban_division);
    assert_eq!(stored.config, user.config);
    assert_eq!(stored.offence_count, 2);
    assert_eq!(store.get_user(4).await.unwrap(), None);
}

#[tokio::test]
async fn rolled_back_insert_leaves_nothing() {
    let store = SqliteStore::temporary().await;

    let permit = store.begin().await.unwrap();
    store.insert_user(&User::new(5)).await.unwrap();
    store.rollback(permit).await.unwrap();

    assert_eq!(store.get_user(5).await.unwrap(), None);
}

#[tokio::test]
async fn writes_require_transaction() {
    let store = SqliteStore::temporary().await;

    assert!(matches!(
        store.insert_user(&User::new(1)).await,
        Err(SqliteError::TransactionMissing)
    ));
    assert!(matches!(
        store.user_for_update(1).await,
        Err(SqliteError::TransactionMissing)
    ));
}

#[tokio::test]
async fn decode_defaults_of_external_rows() {
    let store = SqliteStore::temporary().await;

    // Rows created by other services may rely on the column defaults.
    store
        .execute(async |pool| {
            sqlx::query("INSERT INTO users_v1 (id) VALUES (11)")
                .execute(pool)
                .await?;
            Ok(())
        })
        .await
        .unwrap();

    let user = store.get_user(11).await.unwrap().unwrap();
    assert_eq!(user.config, UserConfig::default());
    assert!(user.ban_division.is_empty());
    assert_eq!(user.offence_count, 0);
}
