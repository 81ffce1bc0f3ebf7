//! Stateless consensus rules: checkpoints, difficulty retargeting, and the
//! emission/size/unlock-time parameters that define the currency itself.
//!
//! Nothing in this crate touches storage or I/O — every function here is a
//! pure computation over values the caller already has on hand, so the
//! blockchain engine can unit-test consensus decisions without a database.

pub mod checkpoints;
pub mod currency;
pub mod difficulty;

pub use checkpoints::{CheckpointConflict, Checkpoints};
pub use currency::{
    base_reward, block_reward, is_unlocked, max_block_cumulative_size, penalize_reward,
    CurrencyParameters, UNLOCK_TIME_HEIGHT_SWITCH,
};
pub use difficulty::{hash_meets_difficulty, next_difficulty, DifficultyCache, DifficultyConfig};
