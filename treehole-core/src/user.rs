// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Identifier of a user, assigned by the upstream authentication service.
pub type UserId = i64;

/// Identifier of a division, the community partition in which bans are tracked.
pub type DivisionId = i64;

/// Divisions a user is muted in, mapped to the time the ban ends.
///
/// `None` marks an indefinite ban, an absent key means the user is not muted in that division.
pub type BanDivision = BTreeMap<DivisionId, Option<Timestamp>>;

/// How folded content is presented to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowFolded {
    #[default]
    Fold,
    Hide,
    Show,
}

impl Display for ShowFolded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            ShowFolded::Fold => "fold",
            ShowFolded::Hide => "hide",
            ShowFolded::Show => "show",
        };
        write!(f, "{value}")
    }
}

/// Per-user preferences.
///
/// Missing fields in stored configurations fall back to their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Events the user wants to be notified about.
    pub notify: Vec<String>,

    /// Presentation of folded content.
    pub show_folded: ShowFolded,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            notify: vec!["mention".into(), "favorite".into(), "report".into()],
            show_folded: ShowFolded::Fold,
        }
    }
}

/// Persistent record of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    pub config: UserConfig,

    /// Currently active bans, kept in sync with the punishment ledger.
    #[serde(skip)]
    pub ban_division: BanDivision,

    /// Number of offences, maintained by moderation flows.
    #[serde(skip)]
    pub offence_count: i64,
}

impl User {
    /// Returns a fresh record with default preferences, no bans and no offences.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            config: UserConfig::default(),
            ban_division: BanDivision::new(),
            offence_count: 0,
        }
    }

    /// Returns `true` if the user has a ban entry for this division.
    pub fn is_banned_in(&self, division_id: DivisionId) -> bool {
        self.ban_division.contains_key(&division_id)
    }

    /// Notice shown to a user who tries to post in a division they are muted in.
    ///
    /// Returns `None` if there is no ban entry for this division. End times beyond what a
    /// calendar date can express are shown like an indefinite ban.
    pub fn ban_message(&self, division_id: DivisionId) -> Option<String> {
        let until = *self.ban_division.get(&division_id)?;
        let until = until
            .and_then(|until| i64::try_from(until).ok())
            .and_then(|until| DateTime::<Utc>::from_timestamp(until, 0));
        let message = match until {
            Some(until) => format!(
                "you are muted in this division until {} UTC",
                until.format("%Y-%m-%d %H:%M:%S")
            ),
            None => "you are muted in this division".to_string(),
        };
        Some(message)
    }
}
