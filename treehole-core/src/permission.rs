// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serialize;

use crate::time::{ADMIN_FOREVER, ADMIN_NEVER, Timestamp};
use crate::user::{BanDivision, DivisionId, User};

/// Capabilities of a caller for the duration of one request.
///
/// Admin status is expressed as the time admin privileges end, so checking for it is a single
/// comparison with the current time: administrators get [`ADMIN_FOREVER`], everybody else
/// [`ADMIN_NEVER`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub admin: Timestamp,

    /// Divisions the caller is muted in and when each ban ends, `None` for indefinite bans.
    pub silent: BanDivision,

    pub offense_count: i64,
}

impl Permission {
    /// Derives the permission view from a reconciled user record and the admin claim of the
    /// caller's token.
    pub fn new(user: &User, is_admin: bool) -> Self {
        Self {
            admin: if is_admin { ADMIN_FOREVER } else { ADMIN_NEVER },
            silent: user.ban_division.clone(),
            offense_count: user.offence_count,
        }
    }

    pub fn is_admin_at(&self, now: Timestamp) -> bool {
        self.admin > now
    }

    /// Returns `true` if the caller is muted in the division at the given time.
    pub fn is_silenced(&self, division_id: DivisionId, now: Timestamp) -> bool {
        match self.silent.get(&division_id) {
            Some(None) => true,
            Some(Some(until)) => *until >= now,
            None => false,
        }
    }
}
