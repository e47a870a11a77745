// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution, moderation state and the tag vocabulary of the treehole forum backend.
//!
//! Every request gets a [`RequestContext`] carrying its headers and deadline. The
//! [`IdentityService`] turns it into the [`CurrentUser`]: the caller is authenticated from the
//! gateway header and access token, its user record is loaded (and created on first contact)
//! and bans which ran out are lifted, all as one atomic unit of work per user record.
//!
//! The [`TagService`] finds or creates tags by name without ever creating duplicates and keeps
//! a listing of all tags in the [`Cache`], refreshed in the background.
//!
//! ```rust,ignore
//! let service = Service::spawn(Config::from_env()?, MemoryCache::new()).await?;
//!
//! let mut ctx = RequestContext::new()
//!     .with_header("X-Consumer-Username", "42")
//!     .with_header("Authorization", &token);
//! let current_user = service.current_user(&mut ctx).await?;
//! let tags = service.find_or_create_tags(&ctx, &["rust".to_string()]).await?;
//! ```
pub mod cache;
pub mod config;
pub mod context;
pub mod identity;
pub mod locks;
pub mod logging;
pub mod search;
mod service;
pub mod tags;
#[cfg(test)]
mod test_utils;

pub use cache::{Cache, CacheError, MemoryCache};
pub use config::{Config, DynamicConfig, Mode};
pub use context::RequestContext;
pub use identity::{CurrentUser, IdentityError, IdentityService};
pub use locks::KeyedLocks;
pub use search::{FloorDocument, FloorId, SearchError, SearchGate, SearchIndex};
pub use service::{Service, ServiceError};
pub use tags::{RefreshError, TagError, TagService};
