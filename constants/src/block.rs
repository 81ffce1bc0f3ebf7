//! Block-related constants.

use core::time::Duration;

/// The maximum block height possible.
///
/// Chosen so that `height * BLOCK_TIME_V1` does not overflow a `u64` count
/// of seconds for many millennia; the engine rejects any block index past
/// this as [`crate::block::MAX_BLOCK_HEIGHT`] violation.
pub const MAX_BLOCK_HEIGHT: u64 = 500_000_000;

/// [`MAX_BLOCK_HEIGHT`] as a [`usize`].
#[expect(clippy::cast_possible_truncation, reason = "will not be truncated")]
pub const MAX_BLOCK_HEIGHT_USIZE: usize = MAX_BLOCK_HEIGHT as usize;

/// Target block time before the difficulty-window retarget switch.
pub const BLOCK_TIME_V1: Duration = Duration::from_secs(60);

/// Target block time from the retarget switch onward.
pub const BLOCK_TIME_V2: Duration = Duration::from_secs(120);

/// Size, in bytes, of the reward zone below which blocks incur no size penalty.
pub const BLOCK_GRANTED_FULL_REWARD_ZONE_V1: u64 = 20_000;

/// Size, in bytes, of the reward zone below which blocks incur no size penalty, post-V2.
pub const BLOCK_GRANTED_FULL_REWARD_ZONE_V2: u64 = 60_000;

/// Size, in bytes, of the reward zone below which blocks incur no size penalty, post-V5.
pub const BLOCK_GRANTED_FULL_REWARD_ZONE_V5: u64 = 300_000;

/// Number of most recent blocks used to compute the effective median block size.
pub const REWARD_BLOCKS_WINDOW: u64 = 100;

/// Number of most recent blocks used for the long-term (penalty-resistant) weight median.
pub const LONG_TERM_BLOCK_WEIGHT_WINDOW: u64 = 100_000;
