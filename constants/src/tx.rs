//! Transaction and mempool constants.

use core::time::Duration;

use crate::difficulty;

/// Maximum encoded transaction size accepted by the validator.
pub const MAX_TX_SIZE: u64 = 1_000_000;

/// Maximum number of transactions permitted in a single block.
pub const MAX_TX_PER_BLOCK: u64 = 0x1000_0000;

/// Number of blocks a coinbase output stays locked before it can be spent.
pub const MINED_MONEY_UNLOCK_WINDOW: u64 = 60;

/// Current transaction format version accepted for new transactions.
pub const CURRENT_TRANSACTION_VERSION: u64 = 2;

/// Default number of blocks an output must age before becoming spendable,
/// absent an explicit `unlock_time`.
pub const DEFAULT_TX_SPENDABLE_AGE: u64 = 10;

/// Number of blocks of slack allowed when a locked transaction's
/// `unlock_time` is given as a height rather than a timestamp.
pub const LOCKED_TX_ALLOWED_DELTA_BLOCKS: u64 = 1;

/// [`LOCKED_TX_ALLOWED_DELTA_BLOCKS`] expressed in seconds at the V1 block time.
pub const LOCKED_TX_ALLOWED_DELTA_SECONDS_V1: u64 =
    difficulty::DIFFICULTY_TARGET_V1.as_secs() * LOCKED_TX_ALLOWED_DELTA_BLOCKS;

/// [`LOCKED_TX_ALLOWED_DELTA_BLOCKS`] expressed in seconds at the V2 block time.
pub const LOCKED_TX_ALLOWED_DELTA_SECONDS_V2: u64 =
    difficulty::DIFFICULTY_TARGET_V2.as_secs() * LOCKED_TX_ALLOWED_DELTA_BLOCKS;

/// Maximum size, in bytes, of a transaction's `extra` field.
pub const MAX_TX_EXTRA_SIZE: u64 = 1_060;

/// How long an unconfirmed transaction is kept in the pool.
///
/// ```rust
/// # use cryptonote_constants::tx::*;
/// assert_eq!(MEMPOOL_TX_LIFETIME.as_secs(), 86_400 * 3);
/// ```
pub const MEMPOOL_TX_LIFETIME: Duration = Duration::from_secs(86_400 * 3);

/// How long a transaction evicted from an alt-chain is kept before it is dropped.
///
/// ```rust
/// # use cryptonote_constants::tx::*;
/// assert_eq!(MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME.as_secs(), 86_400 * 7);
/// ```
pub const MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME: Duration = Duration::from_secs(86_400 * 7);

/// Decimal places used when quantizing the per-kB fee.
pub const PER_KB_FEE_QUANTIZATION_DECIMALS: u64 = 8;

/// Default cap, in bytes, on the total size of pooled (unconfirmed) transactions.
pub const DEFAULT_TXPOOL_MAX_WEIGHT: u64 = 648_000_000; // 3 days at 300000 bytes/block
