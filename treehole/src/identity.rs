// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolve the caller of a request into a user record and its permissions.
//!
//! Loading a user record happens under a lock per user: the record is created if it doesn't exist
//! yet and its ban map is reconciled with the punishment ledger before the lock is released. Two
//! requests of the same user can thus never provision the record twice or observe a half
//! reconciled ban map. Every write is its own atomic unit of work.
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::debug;
use treehole_core::{
    Claims, CredentialError, Credentials, DivisionId, Permission, User, UserId, current_timestamp,
};
use treehole_store::{PunishmentStore, SqliteError, SqliteStore, UserStore};

use crate::config::Mode;
use crate::context::RequestContext;
use crate::locks::KeyedLocks;

/// User id every caller gets in development and test deployments.
pub const DEVELOPMENT_USER_ID: UserId = 1;

/// Caller of a request with the permissions derived for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub user: User,

    pub claims: Claims,

    pub permission: Permission,
}

impl CurrentUser {
    pub fn new(user: User, claims: Claims) -> Self {
        let permission = Permission::new(&user, claims.is_admin);
        Self {
            user,
            claims,
            permission,
        }
    }

    /// Administrator standing in for every caller when authentication is bypassed.
    pub fn development() -> Self {
        let claims = Claims {
            id: Some(DEVELOPMENT_USER_ID),
            is_admin: true,
            ..Claims::default()
        };
        Self::new(User::new(DEVELOPMENT_USER_ID), claims)
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin
    }
}

/// Loads, provisions and reconciles user records.
#[derive(Clone, Debug)]
pub struct IdentityService {
    store: SqliteStore<'static>,
    locks: Arc<KeyedLocks<UserId>>,
    mode: Mode,
    lock_timeout: Duration,
}

impl IdentityService {
    pub fn new(store: SqliteStore<'static>, mode: Mode, lock_timeout: Duration) -> Self {
        Self {
            store,
            locks: Arc::new(KeyedLocks::new()),
            mode,
            lock_timeout,
        }
    }

    /// Returns the caller of this request.
    ///
    /// The first call authenticates the caller, loads the user record and derives the
    /// permissions, later calls with the same context return the remembered result. Callers
    /// which fail to authenticate never reach the database.
    pub async fn current_user(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Arc<CurrentUser>, IdentityError> {
        if let Some(current_user) = ctx.current_user() {
            return Ok(current_user);
        }

        let current_user = if self.mode.bypasses_auth() {
            CurrentUser::development()
        } else {
            let credentials = Credentials::from_headers(ctx)?;
            let user = self
                .load_or_create(credentials.user_id, ctx.deadline())
                .await?;
            CurrentUser::new(user, credentials.claims)
        };

        let current_user = Arc::new(current_user);
        ctx.set_current_user(current_user.clone());
        Ok(current_user)
    }

    /// Loads the user record, creating it with default settings if it doesn't exist.
    ///
    /// Bans in the record's ban map which are not backed by an active punishment anymore are
    /// removed and the cleaned map is written back. All of this happens while holding the lock of
    /// this user, so concurrent requests of the same user wait for each other while requests of
    /// other users proceed. Waiting for the lock gives up at `deadline`, or after the configured
    /// lock timeout when no deadline is given.
    pub async fn load_or_create(
        &self,
        user_id: UserId,
        deadline: Option<Instant>,
    ) -> Result<User, IdentityError> {
        let deadline = deadline.unwrap_or_else(|| Instant::now() + self.lock_timeout);

        let waited_since = Instant::now();
        let _guard = timeout_at(deadline, self.locks.lock(user_id))
            .await
            .map_err(|_| IdentityError::LockTimeout(waited_since.elapsed()))?;

        let Some(mut user) = self.store.get_user(user_id).await? else {
            return self.provision(user_id, deadline).await;
        };

        let now = current_timestamp();
        let division_ids: Vec<DivisionId> = user.ban_division.keys().copied().collect();

        let mut modified = false;
        for division_id in division_ids {
            let punishment = self.store.latest_punishment(user_id, division_id).await?;
            if punishment.is_none_or(|punishment| punishment.is_expired_at(now)) {
                user.ban_division.remove(&division_id);
                modified = true;
                debug!(user_id, division_id, "lift expired ban");
            }
        }

        if modified {
            let ban_division = &user.ban_division;
            self.store
                .unit_of_work(deadline, |store| async move {
                    store.update_ban_division(user_id, ban_division).await
                })
                .await?;
        }

        Ok(user)
    }

    async fn provision(&self, user_id: UserId, deadline: Instant) -> Result<User, IdentityError> {
        let user = User::new(user_id);

        let record = &user;
        let inserted = self
            .store
            .unit_of_work(deadline, |store| async move {
                store.insert_user(record).await
            })
            .await?;

        if inserted {
            debug!(user_id, "created user record");
            return Ok(user);
        }

        // Another process created the record first.
        Ok(self.store.get_user(user_id).await?.unwrap_or(user))
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Caller could not be authenticated.
    #[error("unauthorized: {0}")]
    Unauthenticated(#[from] CredentialError),

    /// Reading or writing the user record or punishment ledger failed.
    #[error(transparent)]
    Storage(SqliteError),

    /// The user record stayed locked by another request for too long.
    #[error("timed out after {0:?} waiting for user record")]
    LockTimeout(Duration),
}

impl IdentityError {
    /// Returns `true` for all failures caused by the database rather than the caller.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::LockTimeout(_))
    }
}

impl From<SqliteError> for IdentityError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::LockTimeout(waited) => Self::LockTimeout(waited),
            err => Self::Storage(err),
        }
    }
}
