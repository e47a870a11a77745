// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;

/// Admin privileges of administrators never expire (9999-01-01T00:00:00Z).
pub const ADMIN_FOREVER: Timestamp = 253_370_764_800;

/// Admin privileges of regular users already expired at the UNIX epoch.
pub const ADMIN_NEVER: Timestamp = 0;

/// Returns the current time as a UNIX timestamp in seconds.
pub fn current_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        // Clocks set before 1970 are treated as the epoch itself.
        .unwrap_or(0)
}
