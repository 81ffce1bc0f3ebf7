//! Errors the pool can return from admission or removal.

use cryptonote_types::Hash;

/// Why a transaction was rejected from (or could not be found in) the pool.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The transaction is already held in the pool.
    #[error("transaction {0} already in pool")]
    AlreadyInPool(Hash),
    /// The transaction is already confirmed on the main chain.
    #[error("transaction {0} already in chain")]
    AlreadyInChain(Hash),
    /// One of the transaction's key-images is already used by another
    /// pooled transaction.
    #[error("key-image double spend against pool")]
    DoubleSpend,
    /// The caller's stateful validation of the transaction failed and
    /// `keep_by_block` was not set.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] cryptonote_consensus::ValidationError),
    /// No transaction with that hash is in the pool.
    #[error("transaction {0} not in pool")]
    NotFound(Hash),
}

/// Shorthand for `Result<T, PoolError>`.
pub type Result<T> = core::result::Result<T, PoolError>;
