// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use treehole_core::{DivisionId, Punishment, UserId};

/// Interface for the append-only ledger of punishments.
pub trait PunishmentStore {
    type Error: Error;

    /// Appends a punishment to the ledger and returns its row id.
    fn insert_punishment(
        &self,
        punishment: &Punishment,
    ) -> impl Future<Output = Result<i64, Self::Error>>;

    /// Returns the punishment governing the ban state of a user in a division.
    ///
    /// This is the entry with the latest start time, ties are broken by insertion order. Only
    /// committed entries are considered, no transaction is required.
    fn latest_punishment(
        &self,
        user_id: UserId,
        division_id: DivisionId,
    ) -> impl Future<Output = Result<Option<Punishment>, Self::Error>>;
}
