// SPDX-License-Identifier: MIT OR Apache-2.0

//! Find-or-create of tags by name and the cached tag listing.
//!
//! Creating tags is safe under concurrency: all callers asking for the same new name end up with
//! the same single tag. Whenever tags were created the cached listing is refreshed in the
//! background. Refresh requests arriving while one is already pending are merged into it.
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::{debug, warn};
use treehole_core::{Tag, TagNameError, validate_tag_name};
use treehole_store::{SqliteError, SqliteStore, TagStore};

use crate::cache::{Cache, CacheError, set_json};

/// Cache key of the tag listing ordered by temperature.
pub const TAGS_CACHE_KEY: &str = "tags";

/// Handle to the tag service.
///
/// Clones share the same background refresher. It stops once the last handle was dropped.
#[derive(Clone, Debug)]
pub struct TagService {
    store: SqliteStore<'static>,
    lock_timeout: Duration,
    refresh_tx: mpsc::Sender<()>,
}

impl TagService {
    /// Creates the service and spawns its cache refresher on the current tokio runtime.
    pub fn spawn<C: Cache>(
        store: SqliteStore<'static>,
        cache: C,
        lock_timeout: Duration,
        ttl: Duration,
    ) -> Self {
        // One pending refresh is enough, it will see all tags created before it runs.
        let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);

        {
            let store = store.clone();
            tokio::spawn(async move {
                while refresh_rx.recv().await.is_some() {
                    if let Err(err) = refresh_tag_cache(&store, &cache, ttl).await {
                        warn!("refreshing tag cache failed: {err}");
                    }
                }

                debug!("tag cache refresher stopped");
            });
        }

        Self {
            store,
            lock_timeout,
            refresh_tx,
        }
    }

    /// Returns the tags with the given names, creating the missing ones.
    ///
    /// Duplicate names are only looked up once. The order of the returned tags is unspecified.
    /// Waiting for the write lock gives up at `deadline`, or after the configured lock timeout
    /// when no deadline is given.
    pub async fn find_or_create(
        &self,
        names: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<Tag>, TagError> {
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            validate_tag_name(name)?;
            if !unique.contains(name) {
                unique.push(name.clone());
            }
        }

        let names = unique;
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let deadline = deadline.unwrap_or_else(|| Instant::now() + self.lock_timeout);
        let mut attempted_insert = false;

        let names = &names;
        let attempted = &mut attempted_insert;
        let result = self
            .store
            .unit_of_work(deadline, |store| async move {
                let mut tags = store.tags_by_names(names).await?;

                let missing: Vec<String> = names
                    .iter()
                    .filter(|name| !tags.iter().any(|tag| &tag.name == *name))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return Ok::<_, TagError>(tags);
                }

                *attempted = true;
                let inserted = store.insert_tags_if_absent(&missing).await?;
                debug!(requested = missing.len(), inserted, "created tags");

                // Read back the missing ones, also those a concurrent caller created first.
                tags.extend(store.tags_by_names(&missing).await?);
                Ok(tags)
            })
            .await;

        if attempted_insert {
            self.schedule_refresh();
        }

        result
    }

    /// Writes the current tag listing to the cache and waits until it is done.
    pub async fn refresh_cache_now<C: Cache>(
        &self,
        cache: &C,
        ttl: Duration,
    ) -> Result<(), RefreshError> {
        refresh_tag_cache(&self.store, cache, ttl).await
    }

    /// Asks the background refresher to rebuild the cached listing.
    fn schedule_refresh(&self) {
        match self.refresh_tx.try_send(()) {
            Ok(()) => (),
            Err(TrySendError::Full(())) => debug!("tag cache refresh already pending"),
            Err(TrySendError::Closed(())) => warn!("tag cache refresher is gone"),
        }
    }
}

async fn refresh_tag_cache<C: Cache>(
    store: &SqliteStore<'static>,
    cache: &C,
    ttl: Duration,
) -> Result<(), RefreshError> {
    let tags = store.tags_by_temperature().await?;
    set_json(cache, TAGS_CACHE_KEY, &tags, ttl).await?;
    debug!(tags = tags.len(), "refreshed tag cache");
    Ok(())
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error(transparent)]
    InvalidName(#[from] TagNameError),

    #[error(transparent)]
    Storage(SqliteError),

    #[error("timed out after {0:?} waiting for tag store")]
    LockTimeout(Duration),
}

impl From<SqliteError> for TagError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::LockTimeout(waited) => Self::LockTimeout(waited),
            err => Self::Storage(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Storage(#[from] SqliteError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[cfg(test)]
mod tests;
