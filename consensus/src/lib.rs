//! The transaction validation pipeline: syntax, then stateless semantics,
//! then stateful input checks, then the size/fee gate.
//!
//! Each stage is also exposed standalone (`syntax::check_syntax`,
//! `semantic::check_semantics`, ...) so the mempool and block-application
//! path can re-run only the stages that actually need repeating — e.g. a
//! pooled transaction re-validated after a reorg only needs
//! [`inputs::check_inputs`] run again, since its syntax and semantics
//! cannot have changed.

pub mod context;
pub mod error;
pub mod inputs;
pub mod semantic;
pub mod signatures;
pub mod size_fee;
pub mod syntax;

pub use context::{KeyImageSpent, OutputLookup, ResolvedOutput, TxSizeLimit};
pub use error::{Result, ValidationError};
pub use inputs::{check_inputs, InputValidationOutcome};

use cryptonote_types::{Hash, Transaction};

/// The outcome of fully validating a (non-coinbase) candidate transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated {
    /// `input_amount_sum - output_amount_sum`.
    pub fee: u64,
    /// Highest block height any resolved input depends on.
    pub max_used_block_height: u64,
}

/// Runs the full pipeline — syntax, semantics, stateful inputs, size/fee —
/// against a candidate transaction. `prefix_hash` must be the transaction's
/// signature-prefix hash (computed by the caller, since it depends on the
/// serialization codec); `blob_size` its encoded length.
///
/// Not for coinbase transactions: a coinbase's output sum is the block
/// reward, not something balanced against its (zero) input sum, so it
/// follows a separate miner-transaction check tied to the reward formula,
/// made against the whole candidate block rather than a lone transaction.
pub fn validate_transaction<O, K, L>(
    tx: &Transaction,
    prefix_hash: &Hash,
    blob_size: u64,
    outputs: &O,
    key_images: &K,
    limits: &L,
) -> Result<Validated>
where
    O: OutputLookup,
    K: KeyImageSpent,
    L: TxSizeLimit,
{
    syntax::check_syntax(tx)?;
    let fee = semantic::check_semantics(tx)?;
    let outcome = inputs::check_inputs(tx, prefix_hash, outputs, key_images)?;
    size_fee::check_size_and_fee(limits, blob_size, fee)?;

    Ok(Validated {
        fee,
        max_used_block_height: outcome.max_used_block_height,
    })
}
