//! C2: the block index — the height <-> hash bijection the engine and
//! consensus rules navigate by, kept separate from the paged block store so
//! "what hash is at height H" never requires decoding a full [`BlockEntry`].

use std::collections::HashMap;

use cryptonote_types::Hash;

/// A dense `height -> hash` array plus its `hash -> height` inverse.
///
/// Mirrors the reference `BlockAccessor`'s `heights` vector; only main-chain
/// heights live here, never alt-chain ones (those are tracked by
/// [`crate::alt_chain::AltChains`] instead, since they are not addressable
/// by height until a reorg promotes them).
#[derive(Debug, Default, Clone)]
pub struct BlockIndex {
    hashes: Vec<Hash>,
    positions: HashMap<Hash, u64>,
}

impl BlockIndex {
    /// An empty index (no genesis pushed yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks indexed — also the height one past the tip.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.hashes.len() as u64
    }

    /// `true` if no block has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Height of the current tip, if any.
    #[must_use]
    pub fn top_height(&self) -> Option<u64> {
        self.size().checked_sub(1)
    }

    /// Appends `hash` as the new tip, at height `size()`.
    pub fn push(&mut self, hash: Hash) {
        let height = self.hashes.len() as u64;
        self.hashes.push(hash);
        self.positions.insert(hash, height);
    }

    /// Removes and returns the current tip's hash, for reorg rollback.
    pub fn pop(&mut self) -> Option<Hash> {
        let hash = self.hashes.pop()?;
        self.positions.remove(&hash);
        Some(hash)
    }

    /// Returns the hash at `height`, if indexed.
    #[must_use]
    pub fn hash_at(&self, height: u64) -> Option<Hash> {
        self.hashes.get(height as usize).copied()
    }

    /// Returns the main-chain height of `hash`, if indexed.
    #[must_use]
    pub fn height_of(&self, hash: &Hash) -> Option<u64> {
        self.positions.get(hash).copied()
    }

    /// `true` if `hash` is on the main chain.
    #[must_use]
    pub fn contains(&self, hash: &Hash) -> bool {
        self.positions.contains_key(hash)
    }

    /// Drops every block above `height` (inclusive of the new tip staying at
    /// `height`), for reorg rollback to a fork point. No-op if `height` is
    /// already at or above the current tip.
    pub fn truncate_to(&mut self, height: u64) {
        let keep = (height + 1) as usize;
        if keep >= self.hashes.len() {
            return;
        }
        for hash in self.hashes.drain(keep..) {
            self.positions.remove(&hash);
        }
    }

    /// Builds a sparse chain of block ids for peer sync handshakes: the tip,
    /// then every `2^n`th ancestor back to genesis (the reference protocol's
    /// "short history" exponential backoff), used so two peers can find
    /// their common ancestor in `O(log n)` round-trips.
    #[must_use]
    pub fn build_sparse_chain(&self) -> Vec<Hash> {
        let Some(top) = self.top_height() else {
            return Vec::new();
        };

        let mut heights = Vec::new();
        let mut step = 1u64;
        let mut height = top;
        loop {
            heights.push(height);
            if height == 0 {
                break;
            }
            height = height.saturating_sub(step);
            step *= 2;
        }
        if *heights.last().unwrap() != 0 {
            heights.push(0);
        }

        heights
            .into_iter()
            .filter_map(|h| self.hash_at(h))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn h(n: u8) -> Hash {
        Hash([n; 32])
    }

    #[test]
    fn push_pop_and_lookup() {
        let mut index = BlockIndex::new();
        index.push(h(0));
        index.push(h(1));
        index.push(h(2));

        assert_eq!(index.size(), 3);
        assert_eq!(index.top_height(), Some(2));
        assert_eq!(index.hash_at(1), Some(h(1)));
        assert_eq!(index.height_of(&h(2)), Some(2));

        assert_eq!(index.pop(), Some(h(2)));
        assert_eq!(index.size(), 2);
        assert!(!index.contains(&h(2)));
    }

    #[test]
    fn truncate_to_drops_above_fork_point() {
        let mut index = BlockIndex::new();
        for i in 0..5u8 {
            index.push(h(i));
        }
        index.truncate_to(2);
        assert_eq!(index.size(), 3);
        assert!(!index.contains(&h(3)));
        assert!(index.contains(&h(2)));
    }

    #[test]
    fn sparse_chain_always_ends_at_genesis() {
        let mut index = BlockIndex::new();
        for i in 0..20u8 {
            index.push(h(i));
        }
        let sparse = index.build_sparse_chain();
        assert_eq!(sparse.first(), Some(&h(19)));
        assert_eq!(sparse.last(), Some(&h(0)));
    }
}
