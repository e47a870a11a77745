// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use treehole_core::Tag;
use treehole_store::{SqliteError, SqliteStore, SqliteStoreBuilder};

use crate::cache::Cache;
use crate::config::{Config, DynamicConfig};
use crate::context::RequestContext;
use crate::identity::{CurrentUser, IdentityError, IdentityService};
use crate::search::{SearchGate, SearchIndex};
use crate::tags::{TagError, TagService};

/// Everything request handlers need, shared by all of them.
#[derive(Clone, Debug)]
pub struct Service<C> {
    config: Arc<Config>,
    dynamic: Arc<DynamicConfig>,
    store: SqliteStore<'static>,
    cache: C,
    identities: IdentityService,
    tags: TagService,
}

impl<C: Cache> Service<C> {
    /// Opens the database and starts the background tasks on the current tokio runtime.
    pub async fn spawn(config: Config, cache: C) -> Result<Self, ServiceError> {
        // Every connection to an in-memory database opens a database of its own.
        let max_connections = if config.is_memory_database() {
            1
        } else {
            config.db_max_connections
        };

        let store = SqliteStoreBuilder::new()
            .database_url(&config.db_url)
            .max_connections(max_connections)
            .build()
            .await?;

        Self::spawn_inner(config, cache, store).await
    }

    pub(crate) async fn spawn_inner(
        config: Config,
        cache: C,
        store: SqliteStore<'static>,
    ) -> Result<Self, ServiceError> {
        match serde_json::to_string(&config) {
            Ok(json) => info!("loaded configuration: {json}"),
            Err(err) => warn!("could not print configuration: {err}"),
        }

        let dynamic = Arc::new(DynamicConfig::new(&config));
        let identities = IdentityService::new(store.clone(), config.mode, config.lock_timeout());
        let tags = TagService::spawn(
            store.clone(),
            cache.clone(),
            config.lock_timeout(),
            config.tag_cache_ttl(),
        );

        // Seed the tag listing so readers find it before the first tag gets created.
        if let Err(err) = tags.refresh_cache_now(&cache, config.tag_cache_ttl()).await {
            warn!("seeding tag cache failed: {err}");
        }

        Ok(Self {
            config: Arc::new(config),
            dynamic,
            store,
            cache,
            identities,
            tags,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dynamic(&self) -> Arc<DynamicConfig> {
        self.dynamic.clone()
    }

    pub fn store(&self) -> &SqliteStore<'static> {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn identities(&self) -> &IdentityService {
        &self.identities
    }

    pub fn tags(&self) -> &TagService {
        &self.tags
    }

    /// Resolves the caller of the request, see [`IdentityService::current_user`].
    pub async fn current_user(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Arc<CurrentUser>, IdentityError> {
        self.identities.current_user(ctx).await
    }

    /// Finds or creates tags on behalf of a request, bounded by the request's deadline.
    pub async fn find_or_create_tags(
        &self,
        ctx: &RequestContext,
        names: &[String],
    ) -> Result<Vec<Tag>, TagError> {
        self.tags.find_or_create(names, ctx.deadline()).await
    }

    /// Puts the search index behind the runtime toggle and page size bounds of this service.
    pub fn search_gate<I: SearchIndex>(&self, index: I) -> SearchGate<I> {
        SearchGate::new(index, self.dynamic.clone(), &self.config)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] SqliteError),
}
