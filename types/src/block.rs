//! Block header and block types.

use crate::hash::Hash;
use crate::transaction::Transaction;

/// A block header.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    /// Major (hard-fork) version.
    pub major_version: u8,
    /// Minor version, used for voting on upcoming hard forks.
    pub minor_version: u8,
    /// UNIX timestamp at which this block was mined.
    pub timestamp: u64,
    /// Hash of the previous block; [`Hash::ZERO`] for genesis.
    pub previous_block_hash: Hash,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

/// A full block: header, coinbase transaction, and the hashes of the
/// transactions it includes (bodies are stored separately, see C1/C3).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// The coinbase ("base") transaction.
    pub miner_tx: Transaction,
    /// Hashes of the non-coinbase transactions included in this block, in
    /// the order they are applied.
    pub tx_hashes: Vec<Hash>,
}

impl Block {
    /// Returns the block height carried by the coinbase input, if the
    /// miner transaction is well-formed.
    #[must_use]
    pub fn coinbase_height(&self) -> Option<u64> {
        match self.miner_tx.inputs.first() {
            Some(crate::transaction::Input::Coinbase { height }) => Some(*height),
            _ => None,
        }
    }
}

/// A fully-validated block as stored by the chain: the wire [`Block`] plus
/// everything derived from it during validation, so it never needs to be
/// recomputed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockEntry {
    /// The block itself.
    pub block: Block,
    /// The block's own id (cached; recomputing a block hash is not free).
    pub id: Hash,
    /// `cumulative_difficulty(h) = cumulative_difficulty(h-1) + difficulty_for_next_block`.
    pub cumulative_difficulty: u128,
    /// Total atomic units generated up to and including this block.
    pub already_generated_coins: u64,
    /// `|serialized(block) + sum(serialized(tx))|` for this block alone.
    pub block_size: u64,
    /// Running sum of `block_size` up to and including this block.
    pub cumulative_size: u64,
    /// Bodies of the non-coinbase transactions included in this block, in
    /// `tx_hashes` order.
    pub transactions: Vec<Transaction>,
    /// Per-transaction (including the coinbase, first) global output index
    /// assigned to each of that transaction's outputs, in output order.
    pub output_indices: Vec<Vec<u64>>,
}
