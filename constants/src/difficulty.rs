//! Difficulty retarget constants.

use core::time::Duration;

/// Target block interval used while `BLOCK_TIME_V1` is in effect.
///
/// ```rust
/// # use cryptonote_constants::difficulty::*;
/// assert_eq!(DIFFICULTY_TARGET_V1.as_secs(), 60);
/// ```
pub const DIFFICULTY_TARGET_V1: Duration = Duration::from_secs(60);

/// Target block interval used while `BLOCK_TIME_V2` is in effect.
///
/// ```rust
/// # use cryptonote_constants::difficulty::*;
/// assert_eq!(DIFFICULTY_TARGET_V2.as_secs(), 120);
/// ```
pub const DIFFICULTY_TARGET_V2: Duration = Duration::from_secs(120);

/// Number of most recent blocks the difficulty oracle looks at, before trimming.
pub const DIFFICULTY_WINDOW: u64 = 720;

/// Number of most recent blocks excluded from the window while it fills up.
pub const DIFFICULTY_LAG: u64 = 15;

/// Number of samples trimmed from each end of the sorted window before averaging.
pub const DIFFICULTY_CUT: u64 = 60;

/// Total span of blocks the oracle needs on hand: `WINDOW + LAG`.
pub const DIFFICULTY_BLOCKS_COUNT: u64 = DIFFICULTY_WINDOW + DIFFICULTY_LAG;
