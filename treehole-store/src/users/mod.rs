// SPDX-License-Identifier: MIT OR Apache-2.0

//! `UserStore` trait for persisting user records as well as a concrete `SqliteStore`
//! implementation.
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::UserStore;
