// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;
use crate::user::{DivisionId, UserId};

/// Entry of the moderation ledger.
///
/// Punishments are historical facts: once written they are never changed. For every pair of user
/// and division the entry with the latest start time decides whether the user is still muted
/// there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Punishment {
    /// Row id, `None` before the entry was stored.
    pub id: Option<i64>,

    pub division_id: DivisionId,

    /// User who got punished.
    pub user_id: UserId,

    /// Moderator who issued the punishment.
    pub made_by: UserId,

    pub start_time: Timestamp,

    pub end_time: Timestamp,
}

impl Punishment {
    pub fn new(
        division_id: DivisionId,
        user_id: UserId,
        made_by: UserId,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            id: None,
            division_id,
            user_id,
            made_by,
            start_time,
            end_time,
        }
    }

    /// Returns `true` if the punishment ended strictly before the given time.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.end_time < now
    }
}
