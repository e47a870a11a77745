// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use treehole_core::{BanDivision, User, UserId};

/// Interface for loading, provisioning and updating user records.
///
/// Methods reading a record in order to write it back (`user_for_update`) and all writes run
/// within the current transaction, callers need to hold a transaction permit.
pub trait UserStore {
    type Error: Error;

    /// Returns the user record within the current transaction.
    ///
    /// The record stays locked for other writers until the transaction ends.
    fn user_for_update(&self, id: UserId)
    -> impl Future<Output = Result<Option<User>, Self::Error>>;

    /// Inserts a new user record.
    ///
    /// Returns `true` when the insert occurred, or `false` when a record with this id already
    /// existed and no insertion occurred.
    fn insert_user(&self, user: &User) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Overwrites only the ban map of a user record.
    ///
    /// Returns `false` if no record with this id exists.
    fn update_ban_division(
        &self,
        id: UserId,
        ban_division: &BanDivision,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Returns the committed state of a user record, outside of any transaction.
    fn get_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>, Self::Error>>;
}
