// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

/// Database transaction provider.
///
/// Holding a transaction is made explicit with a "permit" which has to be handed back on commit
/// or rollback. Only one permit exists at a time, which serialises all writing units of work.
pub trait Transaction {
    type Error: Error;

    type Permit;

    /// Begins a transaction, waiting until no other process holds a permit.
    fn begin(&self) -> impl Future<Output = Result<Self::Permit, Self::Error>>;

    /// Rolls back the transaction and with that all uncommitted changes.
    fn rollback(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Commits the transaction.
    fn commit(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;
}
