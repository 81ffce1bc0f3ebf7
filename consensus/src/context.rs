//! Narrow capability interfaces the validator depends on.
//!
//! The engine (`cryptonote-blockchain`) implements these against its block
//! index and secondary indexes; the validator never holds a reference to
//! the engine itself, only to these traits, so it can be unit-tested
//! against an in-memory fake.

use cryptonote_types::{Hash, OutputTarget};

use crate::error::Result;

/// An output as seen from the validator's point of view: its spending
/// condition plus the bookkeeping needed for the unlock-time check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    /// The output's spending condition.
    pub target: OutputTarget,
    /// The output's own `unlock_time`, copied from its parent transaction.
    pub unlock_time: u64,
    /// Height of the block the output's parent transaction was included in.
    pub height: u64,
}

/// Resolves `(amount, global_index)` references to the outputs they name.
pub trait OutputLookup {
    /// Returns the output at `global_index` within the bucket of outputs of
    /// `amount`, or `None` if no such index exists yet.
    fn resolve(&self, amount: u64, global_index: u64) -> Result<Option<ResolvedOutput>>;

    /// Returns the number of outputs so far created for `amount` — the
    /// exclusive upper bound for `global_index` in [`Self::resolve`].
    fn output_count(&self, amount: u64) -> Result<u64>;

    /// The current chain height and median timestamp, used to decide
    /// whether a locked output has unlocked.
    fn unlock_reference(&self) -> Result<(u64, u64)>;
}

/// Tests whether a key-image has already been spent on the main chain.
pub trait KeyImageSpent {
    /// Returns `true` if `key_image` is already recorded as spent.
    fn is_spent(&self, key_image: &Hash) -> Result<bool>;
}

/// Size limits the validator enforces against, tracked by the engine.
pub trait TxSizeLimit {
    /// Hard ceiling on a single transaction's serialized size.
    fn max_tx_size(&self) -> u64;

    /// The per-byte fee currently required, derived from recent block fill.
    fn required_fee_per_byte(&self) -> u64;
}
