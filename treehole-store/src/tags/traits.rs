// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use treehole_core::Tag;

/// Interface for querying and creating tags.
///
/// Tag names are unique. Uniqueness is enforced by the store itself, inserting a name which
/// already exists is silently ignored instead of failing.
pub trait TagStore {
    type Error: Error;

    /// Returns all tags with one of the given names, in no particular order.
    ///
    /// Reads within the current transaction.
    fn tags_by_names(&self, names: &[String]) -> impl Future<Output = Result<Vec<Tag>, Self::Error>>;

    /// Inserts tags for all given names which do not exist yet.
    ///
    /// Returns the number of tags which got inserted.
    fn insert_tags_if_absent(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<u64, Self::Error>>;

    /// Returns all committed tags, most popular first.
    fn tags_by_temperature(&self) -> impl Future<Output = Result<Vec<Tag>, Self::Error>>;
}
