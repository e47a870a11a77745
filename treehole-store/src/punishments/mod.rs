// SPDX-License-Identifier: MIT OR Apache-2.0

//! `PunishmentStore` trait for the moderation ledger as well as a concrete `SqliteStore`
//! implementation.
mod sqlite;
mod traits;

pub use traits::PunishmentStore;
