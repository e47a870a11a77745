// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract of the floor search index and the gate every search call passes through.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, DynamicConfig};

pub type FloorId = i64;

/// Searchable content of a single floor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorDocument {
    pub id: FloorId,
    pub content: String,
}

/// Interface of the external search index.
pub trait SearchIndex: Send + Sync {
    /// Returns the ids of floors matching the keyword, `size` results starting at `offset`.
    fn search(
        &self,
        keyword: &str,
        size: usize,
        offset: usize,
    ) -> impl Future<Output = Result<Vec<FloorId>, SearchError>> + Send;

    fn bulk_insert(
        &self,
        documents: Vec<FloorDocument>,
    ) -> impl Future<Output = Result<(), SearchError>> + Send;

    fn bulk_delete(&self, ids: Vec<FloorId>)
    -> impl Future<Output = Result<(), SearchError>> + Send;

    fn delete(&self, id: FloorId) -> impl Future<Output = Result<(), SearchError>> + Send;
}

/// Wraps a search index, honouring the runtime search toggle and the page size bounds.
#[derive(Debug)]
pub struct SearchGate<I> {
    index: I,
    dynamic: Arc<DynamicConfig>,
    default_size: usize,
    max_size: usize,
}

impl<I: SearchIndex> SearchGate<I> {
    pub fn new(index: I, dynamic: Arc<DynamicConfig>, config: &Config) -> Self {
        Self {
            index,
            dynamic,
            default_size: config.size,
            max_size: config.max_size.max(1),
        }
    }

    /// Page size used for a requested size: zero picks the default, larger sizes are capped.
    pub fn page_size(&self, size: usize) -> usize {
        let size = if size == 0 { self.default_size } else { size };
        size.clamp(1, self.max_size)
    }

    pub async fn search(
        &self,
        keyword: &str,
        size: usize,
        offset: usize,
    ) -> Result<Vec<FloorId>, SearchError> {
        self.ensure_open()?;
        let size = self.page_size(size);
        debug!(keyword, size, offset, "search floors");
        self.index.search(keyword, size, offset).await
    }

    pub async fn bulk_insert(&self, documents: Vec<FloorDocument>) -> Result<(), SearchError> {
        self.ensure_open()?;
        if documents.is_empty() {
            return Ok(());
        }
        self.index.bulk_insert(documents).await
    }

    pub async fn bulk_delete(&self, ids: Vec<FloorId>) -> Result<(), SearchError> {
        self.ensure_open()?;
        if ids.is_empty() {
            return Ok(());
        }
        self.index.bulk_delete(ids).await
    }

    pub async fn delete(&self, id: FloorId) -> Result<(), SearchError> {
        self.ensure_open()?;
        self.index.delete(id).await
    }

    fn ensure_open(&self) -> Result<(), SearchError> {
        if self.dynamic.open_search() {
            Ok(())
        } else {
            Err(SearchError::Disabled)
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// Search was switched off at runtime.
    #[error("search is disabled")]
    Disabled,

    #[error("search backend failed: {0}")]
    Backend(String),
}
