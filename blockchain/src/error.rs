//! The engine's error taxonomy: storage and validation errors plus the
//! failures only the engine itself can detect (orphan blocks, checkpoint
//! violations, internal inconsistency).

use cryptonote_types::Hash;

/// Why `add_new_block` or a read operation failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Underlying paged-store or snapshot I/O failed.
    #[error(transparent)]
    Storage(#[from] cryptonote_storage::StorageError),
    /// A transaction failed the validator pipeline.
    #[error(transparent)]
    Validation(#[from] cryptonote_consensus::ValidationError),
    /// A pool operation failed.
    #[error(transparent)]
    Pool(#[from] cryptonote_txpool::PoolError),
    /// The candidate block's parent is not known on any chain the engine
    /// tracks.
    #[error("orphan block: parent {0} unknown")]
    Orphan(Hash),
    /// The candidate block (by hash) is already known, on the main chain or
    /// an alt chain.
    #[error("block {0} already known")]
    AlreadyExists(Hash),
    /// A reorganization would rewrite at or below a checkpointed height.
    #[error("reorganization at height {0} crosses a checkpoint")]
    CheckpointViolation(u64),
    /// A block's major/minor version does not match the height's expected
    /// hard-fork vote.
    #[error("block version {major}.{minor} does not match hard-fork schedule at height {height}")]
    WrongVersion {
        /// Observed major version.
        major: u8,
        /// Observed minor version.
        minor: u8,
        /// The height being validated.
        height: u64,
    },
    /// Block timestamp was not after the median of recent blocks.
    #[error("timestamp {timestamp} not after median {median}")]
    TimestampTooOld {
        /// Block's own timestamp.
        timestamp: u64,
        /// Median timestamp of the trailing window.
        median: u64,
    },
    /// Block timestamp was too far in the future.
    #[error("timestamp {timestamp} exceeds now+limit {limit}")]
    TimestampTooNew {
        /// Block's own timestamp.
        timestamp: u64,
        /// `now + BLOCK_FUTURE_TIME_LIMIT`.
        limit: u64,
    },
    /// Proof-of-work hash did not satisfy the required difficulty.
    #[error("proof-of-work does not satisfy required difficulty {0}")]
    InsufficientProofOfWork(u128),
    /// The coinbase transaction failed `prevalidate_miner_transaction`.
    #[error("invalid miner transaction: {0}")]
    InvalidMinerTransaction(&'static str),
    /// Cumulative block size exceeded the height's cap.
    #[error("block cumulative size {actual} exceeds cap {max}")]
    BlockTooLarge {
        /// Observed cumulative size.
        actual: u64,
        /// Cap for this height.
        max: u64,
    },
    /// The coinbase output sum did not equal the computed block reward.
    #[error("coinbase pays {actual}, block reward is {expected}")]
    WrongBlockReward {
        /// Sum of coinbase outputs.
        actual: u64,
        /// Computed `base_reward + fees`.
        expected: u64,
    },
    /// A transaction hash named in the block was not found in the mempool
    /// or the supplied set.
    #[error("referenced transaction {0} not found")]
    MissingTransaction(Hash),
    /// A candidate block at a checkpointed height did not match the
    /// checkpoint hash.
    #[error("block at height {height} does not match checkpoint")]
    CheckpointMismatch {
        /// The height in question.
        height: u64,
    },
    /// An invariant the engine depends on did not hold — e.g. an index
    /// disagreeing with the store it mirrors. Logged at `error!` before
    /// being returned; the host process decides whether to abort.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

/// Shorthand for `Result<T, EngineError>`.
pub type Result<T> = core::result::Result<T, EngineError>;
