// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data types shared by all treehole crates.
//!
//! A caller is represented by a persistent [`User`] record which carries per-user preferences,
//! the set of divisions the user is currently muted in and an offence counter. Moderation history
//! is kept as a ledger of [`Punishment`] entries and is the source of truth for the ban state
//! mirrored on the user record.
//!
//! Callers are identified from request headers (see [`credentials`]) and every request derives an
//! immutable [`Permission`] view from the user record and the claims of the caller's token.
pub mod credentials;
pub mod permission;
pub mod punishment;
pub mod tag;
pub mod time;
pub mod user;

pub use credentials::{Claims, CredentialError, Credentials, RequestHeaders};
pub use permission::Permission;
pub use punishment::Punishment;
pub use tag::{MAX_TAG_NAME_LENGTH, Tag, TagNameError, validate_tag_name};
pub use time::{ADMIN_FOREVER, ADMIN_NEVER, Timestamp, current_timestamp};
pub use user::{BanDivision, DivisionId, ShowFolded, User, UserConfig, UserId};
