// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, migrate};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, timeout_at};
use tracing::warn;
use treehole_core::Timestamp;

use crate::traits::Transaction as _;

/// Create SQLite database if it doesn't already exist.
pub async fn create_database(url: &str) -> Result<(), SqliteError> {
    if !Sqlite::database_exists(url).await? {
        Sqlite::create_database(url).await?
    }
    Ok(())
}

/// Get migrations from folder without running them.
pub fn migrations() -> Migrator {
    migrate!()
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &sqlx::SqlitePool) -> Result<(), SqliteError> {
    migrations().run(pool).await?;
    Ok(())
}

pub struct SqliteStoreBuilder {
    url: String,
    max_connections: u32,
    run_migrations: bool,
    create_database: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 16,
            create_database: true,
            run_migrations: true,
        }
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn random_memory_url(mut self) -> Self {
        // Every temporary database gets a random name to keep tests isolated from each other.
        //
        // See related issue: https://github.com/launchbadge/sqlx/issues/2510
        self.url = format!(
            "sqlite://dbmem{}?mode=memory&cache=private",
            rand::random::<u32>()
        );
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_database(mut self, create_database: bool) -> Self {
        self.create_database = create_database;
        self
    }

    pub fn run_default_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    pub async fn build<'a>(self) -> Result<SqliteStore<'a>, SqliteError> {
        if self.create_database {
            create_database(&self.url).await?;
        }

        let pool: sqlx::SqlitePool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await?;

        if self.run_migrations {
            run_pending_migrations(&pool).await?;
        }

        Ok(SqliteStore::new(pool))
    }
}

pub type Transaction<'a> = sqlx::Transaction<'a, Sqlite>;

/// SQLite database with connection pool and transaction provider.
///
/// Clones share the same connection pool and the same transaction, if one was started.
///
/// SQLite allows only one writing transaction at a time. Processes beginning a transaction
/// acquire a `TransactionPermit` and hold it until the transaction got committed or rolled back,
/// any other process trying to begin a transaction waits for the permit. This makes the permit
/// the exclusive lock over all rows touched within the transaction: reading a user record and
/// writing it back within one permit can not interleave with another writer.
///
/// Queries which only need committed state can use `execute` and run directly on the pool without
/// waiting for a permit.
#[derive(Clone, Debug)]
pub struct SqliteStore<'a> {
    tx: Arc<Mutex<Option<Transaction<'a>>>>,
    pool: sqlx::SqlitePool,
    semaphore: Arc<Semaphore>,
}

impl<'a> SqliteStore<'a> {
    pub(crate) fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            tx: Arc::default(),
            pool,
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Shortcut building an in-memory SQLite database with a randomised name for testing purposes.
    #[cfg(any(test, feature = "test_utils"))]
    pub async fn temporary() -> Self {
        SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .expect("migrations succeeded")
    }

    /// Execute SQL query within transaction.
    ///
    /// This method will return an error when no transaction is currently given. Make sure to call
    /// `begin` before.
    pub async fn tx<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut Transaction) -> Result<R, SqliteError>,
    {
        let mut tx_ref = self.tx.lock().await;
        let tx = tx_ref.as_mut().ok_or(SqliteError::TransactionMissing)?;

        f(tx).await
    }

    /// Execute SQL query directly on the pool, outside of any transaction.
    pub async fn execute<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&sqlx::SqlitePool) -> Result<R, SqliteError>,
    {
        f(&self.pool).await
    }

    /// Begins a transaction, waiting for the permit at most until the given deadline.
    ///
    /// Returns `SqliteError::LockTimeout` if another process still holds the permit when the
    /// deadline passed.
    pub async fn begin_before(&self, deadline: Instant) -> Result<TransactionPermit, SqliteError> {
        let waited_since = Instant::now();
        match timeout_at(deadline, self.begin()).await {
            Ok(result) => result,
            Err(_) => Err(SqliteError::LockTimeout(waited_since.elapsed())),
        }
    }

    /// Runs `f` as one atomic unit of work.
    ///
    /// `f` receives a handle to this store and all store methods it calls take part in the
    /// transaction. The transaction is committed when `f` succeeds. On any error it is rolled back
    /// and the error is returned, leaving no partial changes behind. Dropping the returned future
    /// before it finished rolls the transaction back as well.
    pub async fn unit_of_work<F, Fut, R, E>(&self, deadline: Instant, f: F) -> Result<R, E>
    where
        F: FnOnce(SqliteStore<'a>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<SqliteError>,
    {
        let permit = self.begin_before(deadline).await?;
        let guard = AbortGuard {
            tx: self.tx.clone(),
            permit: Some(permit),
        };

        let result = f(self.clone()).await;
        let permit = guard.disarm();

        match result {
            Ok(value) => {
                self.commit(permit).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback(permit).await {
                    warn!("rolling back failed unit of work: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}

/// Rolls back the transaction of a unit of work which was dropped before it finished.
///
/// The transaction is cleared before the permit is released, so the next holder of the permit
/// never sees it.
struct AbortGuard<'a> {
    tx: Arc<Mutex<Option<Transaction<'a>>>>,
    permit: Option<TransactionPermit>,
}

impl AbortGuard<'_> {
    fn disarm(mut self) -> TransactionPermit {
        self.permit
            .take()
            .expect("permit is only taken once, when disarming")
    }
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };

        // Dropping an unfinished sqlx transaction rolls it back. If the slot is locked right now
        // the next `begin` removes the transaction instead.
        if let Ok(mut tx_ref) = self.tx.try_lock() {
            tx_ref.take();
        }
        warn!("rolled back cancelled unit of work");
        drop(permit);
    }
}

impl<'a> crate::traits::Transaction for SqliteStore<'a> {
    type Error = SqliteError;

    type Permit = TransactionPermit;

    /// Begins a transaction.
    ///
    /// Transactions are strictly serialized, any concurrent process calling this will wait here
    /// while another process holds a permit.
    async fn begin(&self) -> Result<TransactionPermit, SqliteError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("if semaphore is closed then the whole struct is gone as well");

        let mut tx_ref = self.tx.lock().await;
        if tx_ref.take().is_some() {
            // Left behind by a process which got cancelled while finishing its transaction,
            // dropping it rolls it back.
            warn!("discarded transaction of a cancelled process");
        }

        let tx = self.pool.begin().await?;
        tx_ref.replace(tx);

        Ok(TransactionPermit(permit))
    }

    /// Rolls back the transaction and frees the permit, also when the rollback failed.
    async fn rollback(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            panic!("can't have no transaction without dropping permit first")
        };

        let result = tx.rollback().await.map_err(SqliteError::Sqlite);
        drop(permit);
        result
    }

    /// Commits the transaction and frees the permit, also when the commit failed.
    async fn commit(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            panic!("can't have no transaction without dropping permit first")
        };

        let result = tx.commit().await.map_err(SqliteError::Sqlite);
        drop(permit);
        result
    }
}

#[allow(unused)]
pub struct TransactionPermit(OwnedSemaphorePermit);

/// Converts a timestamp into the signed integer representation SQLite stores.
pub(crate) fn to_sql_timestamp(timestamp: Timestamp) -> i64 {
    i64::try_from(timestamp).unwrap_or(i64::MAX)
}

/// Converts a stored timestamp back, rejecting negative values.
pub(crate) fn from_sql_timestamp(field: &str, value: i64) -> Result<Timestamp, SqliteError> {
    Timestamp::try_from(value)
        .map_err(|_| SqliteError::Decode(field.to_string(), DecodeError::Timestamp(value)))
}

#[derive(Debug, Error)]
pub enum SqliteError {
    /// This is a critical error as it indicates that something is wrong with the usage of this
    /// API: Queries using transactions can only ever occur if a transaction was started _before_.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    /// Another process held the transaction permit for longer than we were willing to wait.
    #[error("timed out after {0:?} waiting for transaction permit")]
    LockTimeout(Duration),

    /// SQLite database and connection error.
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    /// SQL table schema migration error.
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A value could not be encoded before storing it into the database.
    #[error("failed encoding '{0}' value before storing to database: {1}")]
    Encode(String, serde_json::Error),

    /// Invalid, corrupted data was found in the database. This is a critical error.
    #[error("could not decode corrupted '{0}' value from database: {1}")]
    Decode(String, DecodeError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("negative timestamp {0}")]
    Timestamp(i64),
}
