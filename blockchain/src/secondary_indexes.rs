//! C3: secondary indexes the engine maintains alongside the block index —
//! payment-id -> tx, timestamp -> block, height -> orphans, and
//! height -> generated-tx-count. None of these are load-bearing for
//! consensus; they exist purely to answer queries without a linear scan.

use std::collections::{BTreeMap, HashMap, HashSet};

use bytes::{Buf, BufMut};
use cryptonote_serialization::binary::{Decode, Encode};
use cryptonote_serialization::varint::{read_varint, write_varint};
use cryptonote_types::Hash;

/// The four secondary indexes, persisted together as
/// `blockchainindices.dat`.
#[derive(Debug, Default, Clone)]
pub struct SecondaryIndexes {
    by_payment_id: HashMap<Hash, HashSet<Hash>>,
    by_timestamp: BTreeMap<u64, Vec<Hash>>,
    orphans_by_height: HashMap<u64, HashSet<Hash>>,
    generated_tx_count_by_height: HashMap<u64, u64>,
}

impl SecondaryIndexes {
    /// Empty indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly-applied main-chain block: its timestamp bucket, the
    /// payment ids carried by its transactions, and the running generated
    /// tx count.
    pub fn record_block(
        &mut self,
        height: u64,
        block_hash: Hash,
        timestamp: u64,
        payment_ids: &[(Hash, Hash)],
        tx_count_this_block: u64,
    ) {
        self.by_timestamp.entry(timestamp).or_default().push(block_hash);
        for (payment_id, tx_hash) in payment_ids {
            self.by_payment_id.entry(*payment_id).or_default().insert(*tx_hash);
        }
        let previous = height
            .checked_sub(1)
            .and_then(|h| self.generated_tx_count_by_height.get(&h))
            .copied()
            .unwrap_or(0);
        self.generated_tx_count_by_height
            .insert(height, previous + tx_count_this_block);
    }

    /// Reverses [`Self::record_block`], for reorg rollback.
    pub fn remove_block(
        &mut self,
        height: u64,
        block_hash: Hash,
        timestamp: u64,
        payment_ids: &[(Hash, Hash)],
    ) {
        if let Some(bucket) = self.by_timestamp.get_mut(&timestamp) {
            bucket.retain(|h| h != &block_hash);
            if bucket.is_empty() {
                self.by_timestamp.remove(&timestamp);
            }
        }
        for (payment_id, tx_hash) in payment_ids {
            if let Some(set) = self.by_payment_id.get_mut(payment_id) {
                set.remove(tx_hash);
                if set.is_empty() {
                    self.by_payment_id.remove(payment_id);
                }
            }
        }
        self.generated_tx_count_by_height.remove(&height);
    }

    /// Records that `block_hash` is a known alt-chain block at `height`,
    /// not yet on the main chain.
    pub fn add_orphan(&mut self, height: u64, block_hash: Hash) {
        self.orphans_by_height.entry(height).or_default().insert(block_hash);
    }

    /// Removes an alt-chain block from the orphan index, e.g. once it is
    /// promoted to the main chain or pruned beyond the reorg depth.
    pub fn remove_orphan(&mut self, height: u64, block_hash: &Hash) {
        if let Some(set) = self.orphans_by_height.get_mut(&height) {
            set.remove(block_hash);
            if set.is_empty() {
                self.orphans_by_height.remove(&height);
            }
        }
    }

    /// Alt-chain blocks known at `height`.
    #[must_use]
    pub fn orphans_at(&self, height: u64) -> Vec<Hash> {
        self.orphans_by_height
            .get(&height)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Main-chain block hashes sharing `timestamp`.
    #[must_use]
    pub fn blocks_at_timestamp(&self, timestamp: u64) -> &[Hash] {
        self.by_timestamp.get(&timestamp).map_or(&[], Vec::as_slice)
    }

    /// Transactions carrying `payment_id` in a recognised nonce field.
    #[must_use]
    pub fn txs_by_payment_id(&self, payment_id: &Hash) -> Vec<Hash> {
        self.by_payment_id
            .get(payment_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Cumulative count of non-coinbase transactions included up to and
    /// including `height`.
    #[must_use]
    pub fn generated_tx_count_at(&self, height: u64) -> u64 {
        self.generated_tx_count_by_height.get(&height).copied().unwrap_or(0)
    }
}

impl Encode for SecondaryIndexes {
    fn encode<B: BufMut>(&self, w: &mut B) {
        write_varint(self.by_payment_id.len() as u64, w);
        for (payment_id, txs) in &self.by_payment_id {
            payment_id.encode(w);
            let txs: Vec<Hash> = txs.iter().copied().collect();
            txs.encode(w);
        }

        write_varint(self.by_timestamp.len() as u64, w);
        for (timestamp, hashes) in &self.by_timestamp {
            write_varint(*timestamp, w);
            hashes.encode(w);
        }

        write_varint(self.orphans_by_height.len() as u64, w);
        for (height, hashes) in &self.orphans_by_height {
            write_varint(*height, w);
            let hashes: Vec<Hash> = hashes.iter().copied().collect();
            hashes.encode(w);
        }

        write_varint(self.generated_tx_count_by_height.len() as u64, w);
        for (height, count) in &self.generated_tx_count_by_height {
            write_varint(*height, w);
            write_varint(*count, w);
        }
    }
}

impl Decode for SecondaryIndexes {
    fn decode<B: Buf>(r: &mut B) -> cryptonote_serialization::Result<Self> {
        let mut indexes = Self::new();

        let payment_id_count = read_varint(r)?;
        for _ in 0..payment_id_count {
            let payment_id = Hash::decode(r)?;
            let txs = Vec::<Hash>::decode(r)?;
            indexes.by_payment_id.insert(payment_id, txs.into_iter().collect());
        }

        let timestamp_count = read_varint(r)?;
        for _ in 0..timestamp_count {
            let timestamp = read_varint(r)?;
            let hashes = Vec::<Hash>::decode(r)?;
            indexes.by_timestamp.insert(timestamp, hashes);
        }

        let orphan_count = read_varint(r)?;
        for _ in 0..orphan_count {
            let height = read_varint(r)?;
            let hashes = Vec::<Hash>::decode(r)?;
            indexes.orphans_by_height.insert(height, hashes.into_iter().collect());
        }

        let generated_count = read_varint(r)?;
        for _ in 0..generated_count {
            let height = read_varint(r)?;
            let count = read_varint(r)?;
            indexes.generated_tx_count_by_height.insert(height, count);
        }

        Ok(indexes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_and_remove_block_round_trips() {
        let mut indexes = SecondaryIndexes::new();
        let block_hash = Hash([1; 32]);
        let payment_id = Hash([2; 32]);
        let tx_hash = Hash([3; 32]);

        indexes.record_block(5, block_hash, 1000, &[(payment_id, tx_hash)], 2);
        assert_eq!(indexes.blocks_at_timestamp(1000), &[block_hash]);
        assert_eq!(indexes.txs_by_payment_id(&payment_id), vec![tx_hash]);
        assert_eq!(indexes.generated_tx_count_at(5), 2);

        indexes.remove_block(5, block_hash, 1000, &[(payment_id, tx_hash)]);
        assert!(indexes.blocks_at_timestamp(1000).is_empty());
        assert!(indexes.txs_by_payment_id(&payment_id).is_empty());
        assert_eq!(indexes.generated_tx_count_at(5), 0);
    }

    #[test]
    fn generated_tx_count_accumulates_across_heights() {
        let mut indexes = SecondaryIndexes::new();
        indexes.record_block(0, Hash([1; 32]), 1000, &[], 3);
        indexes.record_block(1, Hash([2; 32]), 1060, &[], 2);
        assert_eq!(indexes.generated_tx_count_at(0), 3);
        assert_eq!(indexes.generated_tx_count_at(1), 5);
    }

    #[test]
    fn orphans_are_tracked_per_height() {
        let mut indexes = SecondaryIndexes::new();
        let a = Hash([1; 32]);
        let b = Hash([2; 32]);
        indexes.add_orphan(10, a);
        indexes.add_orphan(10, b);
        assert_eq!(indexes.orphans_at(10).len(), 2);

        indexes.remove_orphan(10, &a);
        assert_eq!(indexes.orphans_at(10), vec![b]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut indexes = SecondaryIndexes::new();
        indexes.record_block(0, Hash([9; 32]), 1000, &[(Hash([1; 32]), Hash([2; 32]))], 1);
        indexes.add_orphan(1, Hash([3; 32]));

        let bytes = cryptonote_serialization::binary::to_vec(&indexes);
        let back: SecondaryIndexes = cryptonote_serialization::binary::from_slice(&bytes).unwrap();

        assert_eq!(back.generated_tx_count_at(0), 1);
        assert_eq!(back.orphans_at(1), vec![Hash([3; 32])]);
    }
}
