// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence of user records, the punishment ledger and tags in SQLite.
//!
//! Every persisted concern has its own store trait (`UserStore`, `PunishmentStore`, `TagStore`)
//! implemented by [`SqliteStore`]. Writes and reads which feed into writes run inside a
//! transaction: begin one through the [`Transaction`] trait (or run a whole [unit of
//! work](SqliteStore::unit_of_work)) and all store methods called while holding the permit take
//! part in it. Queries which only need committed state run directly on the connection pool.
//!
//! ```rust,ignore
//! let store = SqliteStoreBuilder::new().database_url("sqlite://treehole.db").build().await?;
//!
//! let permit = store.begin().await?;
//! store.insert_tags_if_absent(&["rust".to_string()]).await?;
//! store.commit(permit).await?;
//! ```
pub mod punishments;
pub mod sqlite;
pub mod tags;
mod traits;
pub mod users;

pub use punishments::PunishmentStore;
pub use sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder, TransactionPermit};
pub use tags::TagStore;
pub use traits::Transaction;
pub use users::UserStore;
