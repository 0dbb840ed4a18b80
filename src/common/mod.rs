use std::time::Duration;

/// Time a rejected client gets to read the capacity message before the socket is dropped.
pub const CAPACITY_GRACE_DELAY: Duration = Duration::from_secs(5);

pub const ACCEPT_LOOP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const SESSION_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a failed `accept()` so a persistent fault (e.g. fd exhaustion) does not spin.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub const MIN_KEEPALIVE: Duration = Duration::from_secs(1);
pub const KEEPALIVE_RETRIES: u32 = 3;

/// Peers queried at the same time while planning a robbery. Each query races
/// one socket per candidate port, so this keeps the planner well below the
/// usual open-file limit.
pub const PEER_QUERY_CONCURRENCY: usize = 8;

/// Longest request or response line accepted, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;
