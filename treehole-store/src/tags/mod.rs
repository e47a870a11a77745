// SPDX-License-Identifier: MIT OR Apache-2.0

//! `TagStore` trait for the shared tag vocabulary as well as a concrete `SqliteStore`
//! implementation.
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::TagStore;
