//! Alternative ("alt") chains: blocks that extend something other than the
//! current main-chain tip, tracked until they are either promoted by a
//! reorganization or pruned once they fall too far behind.

use std::collections::{HashMap, HashSet};

use cryptonote_types::{BlockEntry, Hash};

use crate::block_index::BlockIndex;

/// A contiguous run of alt-chain blocks from just above a main-chain fork
/// point up to some alt tip, in ascending-height order.
#[derive(Debug, Clone)]
pub struct AltBranch {
    /// Height of the main-chain block the branch forks from.
    pub fork_height: u64,
    /// Hash of the main-chain block the branch forks from.
    pub fork_hash: Hash,
    /// The alt blocks, ascending height, `fork_height + 1 ..= tip height`.
    pub blocks: Vec<BlockEntry>,
}

impl AltBranch {
    /// Total cumulative difficulty at the branch's tip — directly
    /// comparable to the main chain's tip cumulative difficulty, since both
    /// values are totals from genesis rather than totals over the forked
    /// range alone.
    #[must_use]
    pub fn tip_cumulative_difficulty(&self) -> u128 {
        self.blocks.last().map_or(0, |b| b.cumulative_difficulty)
    }
}

/// Blocks known to extend something other than the main-chain tip, keyed by
/// their own hash.
#[derive(Debug, Default)]
pub struct AltChains {
    blocks: HashMap<Hash, BlockEntry>,
}

impl AltChains {
    /// An empty alt-chain map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new alt-chain block.
    pub fn insert(&mut self, entry: BlockEntry) {
        self.blocks.insert(entry.id, entry);
    }

    /// Returns the alt-chain entry for `hash`, if known.
    #[must_use]
    pub fn get(&self, hash: &Hash) -> Option<&BlockEntry> {
        self.blocks.get(hash)
    }

    /// Removes and returns the alt-chain entry for `hash`, if known —
    /// e.g. once it is promoted to the main chain.
    pub fn remove(&mut self, hash: &Hash) -> Option<BlockEntry> {
        self.blocks.remove(hash)
    }

    /// `true` if `hash` names a known alt-chain block.
    #[must_use]
    pub fn contains(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Number of alt-chain blocks currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// `true` if no alt-chain blocks are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Walks backward from `tip` along `previous_block_hash` pointers
    /// through the alt map until a main-chain ancestor is found, collecting
    /// the walked blocks in ascending-height order.
    ///
    /// Returns `None` if the walk exceeds `max_depth` hops without reaching
    /// the main chain (an orphan whose root parent is unknown, or one that
    /// would require an unbounded reorg).
    #[must_use]
    pub fn branch_to_main_ancestor(
        &self,
        tip: Hash,
        block_index: &BlockIndex,
        max_depth: u64,
    ) -> Option<AltBranch> {
        let mut reversed = Vec::new();
        let mut current = self.blocks.get(&tip)?.clone();

        loop {
            let parent_hash = current.block.header.previous_block_hash;
            reversed.push(current);

            if let Some(fork_height) = block_index.height_of(&parent_hash) {
                reversed.reverse();
                return Some(AltBranch {
                    fork_height,
                    fork_hash: parent_hash,
                    blocks: reversed,
                });
            }

            if reversed.len() as u64 >= max_depth {
                return None;
            }

            current = self.blocks.get(&parent_hash)?.clone();
        }
    }

    /// Drops every tracked block at or below `below_height`, except those
    /// named in `keep` — bounds the alt map's memory to the reorg depth
    /// window rather than retaining every alt block forever.
    pub fn prune_below(&mut self, below_height: u64, keep: &HashSet<Hash>) {
        self.blocks
            .retain(|hash, entry| entry.block.coinbase_height().unwrap_or(0) > below_height || keep.contains(hash));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cryptonote_types::{Block, BlockHeader, Input, Transaction};

    fn entry(id: u8, prev: u8, cumulative_difficulty: u128) -> BlockEntry {
        BlockEntry {
            block: Block {
                header: BlockHeader {
                    major_version: 1,
                    minor_version: 0,
                    timestamp: 1000,
                    previous_block_hash: Hash([prev; 32]),
                    nonce: 0,
                },
                miner_tx: Transaction {
                    version: 2,
                    unlock_time: 0,
                    inputs: vec![Input::Coinbase { height: id as u64 }],
                    outputs: vec![],
                    extra: vec![],
                    signatures: vec![],
                },
                tx_hashes: vec![],
            },
            id: Hash([id; 32]),
            cumulative_difficulty,
            already_generated_coins: 0,
            block_size: 0,
            cumulative_size: 0,
            transactions: vec![],
            output_indices: vec![],
        }
    }

    #[test]
    fn walks_back_to_main_chain_ancestor() {
        let mut index = BlockIndex::new();
        index.push(Hash([0; 32]));
        index.push(Hash([1; 32]));
        index.push(Hash([2; 32])); // main tip at height 2

        let mut alt = AltChains::new();
        alt.insert(entry(10, 2, 5));
        alt.insert(entry(11, 10, 6));

        let branch = alt.branch_to_main_ancestor(Hash([11; 32]), &index, 100).unwrap();
        assert_eq!(branch.fork_height, 2);
        assert_eq!(branch.blocks.len(), 2);
        assert_eq!(branch.blocks[0].id, Hash([10; 32]));
        assert_eq!(branch.blocks[1].id, Hash([11; 32]));
        assert_eq!(branch.tip_cumulative_difficulty(), 6);
    }

    #[test]
    fn returns_none_beyond_max_depth() {
        let mut index = BlockIndex::new();
        index.push(Hash([0; 32]));

        let mut alt = AltChains::new();
        alt.insert(entry(10, 0, 1));
        alt.insert(entry(11, 10, 2));

        assert!(alt.branch_to_main_ancestor(Hash([11; 32]), &index, 1).is_none());
    }
}
