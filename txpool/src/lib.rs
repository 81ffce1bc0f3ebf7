//! The unconfirmed transaction pool.
//!
//! The pool never runs the transaction validator itself — it has no access
//! to the output index or key-image set, only to whatever `Result` the
//! engine computed while holding its lock — it is purely bookkeeping:
//! admission, removal, TTL eviction, block-template fill and reorg replay,
//! the way the spec's "C8 Memory pool" draws the line between validation
//! and pooling.

pub mod entry;
pub mod error;

pub use entry::PoolEntry;
pub use error::{PoolError, Result};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use cryptonote_constants::tx::{MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME, MEMPOOL_TX_LIFETIME};
use cryptonote_types::{Hash, Transaction};

/// The in-memory unconfirmed transaction pool and its secondary indexes.
#[derive(Debug, Default)]
pub struct Mempool {
    entries: HashMap<Hash, PoolEntry>,
    /// key-image -> the pooled transaction that spends it, for double-spend
    /// detection against other pending transactions.
    key_images: HashMap<Hash, Hash>,
    /// receive_time -> transactions received at that second, oldest first
    /// within a tie via insertion order (a `BTreeMap<u64, Vec<Hash>>`
    /// preserves push order within a bucket).
    by_receive_time: BTreeMap<u64, Vec<Hash>>,
    /// first-public-key-extra-field-derived payment id -> transactions
    /// carrying it, for payment-id lookups.
    by_payment_id: HashMap<Hash, HashSet<Hash>>,
}

impl Mempool {
    /// An empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions currently pooled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the pool holds no transactions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if `tx_hash` is currently pooled.
    #[must_use]
    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.entries.contains_key(tx_hash)
    }

    /// Returns the pooled entry for `tx_hash`, if any.
    #[must_use]
    pub fn get(&self, tx_hash: &Hash) -> Option<&PoolEntry> {
        self.entries.get(tx_hash)
    }

    /// Attempts to admit a candidate transaction.
    ///
    /// `already_in_chain` and `validation` are supplied by the caller, since
    /// only the engine (holding its lock) can answer "is this tx already
    /// confirmed?" and "does this tx pass stateful validation?". When
    /// `keep_by_block` is set (reorg replay of a discarded chain's
    /// transactions), a failing `validation` does not reject the entry, and
    /// a key-image collision against the pool is recorded rather than
    /// rejected, matching the admission contract.
    pub fn add_tx(
        &mut self,
        tx: Transaction,
        tx_hash: Hash,
        blob_size: u64,
        fee: u64,
        receive_time: u64,
        max_used_height: u64,
        already_in_chain: bool,
        keep_by_block: bool,
        validation: core::result::Result<(), cryptonote_consensus::ValidationError>,
    ) -> Result<()> {
        if self.entries.contains_key(&tx_hash) {
            return Err(PoolError::AlreadyInPool(tx_hash));
        }
        if already_in_chain {
            return Err(PoolError::AlreadyInChain(tx_hash));
        }

        let colliding_key_images: Vec<Hash> = tx
            .key_images()
            .filter(|image| self.key_images.contains_key(*image))
            .copied()
            .collect();

        if !colliding_key_images.is_empty() && !keep_by_block {
            return Err(PoolError::DoubleSpend);
        }

        if let Err(e) = validation {
            if !keep_by_block {
                return Err(PoolError::ValidationFailed(e));
            }
        }

        for image in tx.key_images() {
            self.key_images.insert(*image, tx_hash);
        }
        self.by_receive_time.entry(receive_time).or_default().push(tx_hash);
        for payment_id in payment_ids(&tx) {
            self.by_payment_id.entry(payment_id).or_default().insert(tx_hash);
        }

        self.entries.insert(
            tx_hash,
            PoolEntry {
                tx,
                tx_hash,
                blob_size,
                fee,
                receive_time,
                max_used_height,
                keep_by_block,
                last_failed_block: None,
            },
        );
        Ok(())
    }

    /// Removes a transaction, e.g. because it was just included in a block.
    /// Returns the removed entry, if it was present.
    pub fn remove(&mut self, tx_hash: &Hash) -> Option<PoolEntry> {
        let entry = self.entries.remove(tx_hash)?;
        for image in entry.tx.key_images() {
            self.key_images.remove(image);
        }
        if let Some(bucket) = self.by_receive_time.get_mut(&entry.receive_time) {
            bucket.retain(|h| h != tx_hash);
            if bucket.is_empty() {
                self.by_receive_time.remove(&entry.receive_time);
            }
        }
        for payment_id in payment_ids(&entry.tx) {
            if let Some(set) = self.by_payment_id.get_mut(&payment_id) {
                set.remove(tx_hash);
                if set.is_empty() {
                    self.by_payment_id.remove(&payment_id);
                }
            }
        }
        Some(entry)
    }

    /// Evicts transactions that have exceeded their TTL. Ordinary entries
    /// live for [`MEMPOOL_TX_LIFETIME`]; entries reinserted by reorg replay
    /// (`keep_by_block`) get the longer
    /// [`MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME`], since they represent work
    /// that was briefly confirmed. Returns the evicted hashes.
    pub fn on_idle(&mut self, now: u64) -> Vec<Hash> {
        let expired: Vec<Hash> = self
            .entries
            .values()
            .filter(|entry| {
                let lifetime = if entry.keep_by_block {
                    MEMPOOL_TX_FROM_ALT_BLOCK_LIVETIME.as_secs()
                } else {
                    MEMPOOL_TX_LIFETIME.as_secs()
                };
                now.saturating_sub(entry.receive_time) > lifetime
            })
            .map(|entry| entry.tx_hash)
            .collect();

        for hash in &expired {
            self.remove(hash);
        }
        expired
    }

    /// Re-validates every pooled transaction whose `max_used_height` is
    /// above `fork_point` after a reorganization. Entries that fail and are
    /// not `keep_by_block` are dropped; the caller supplies `revalidate` to
    /// run the stateful input check against the new chain tip (the pool
    /// itself cannot, having no output index access).
    pub fn revalidate_after_reorg<F>(&mut self, fork_point: u64, mut revalidate: F) -> Vec<Hash>
    where
        F: FnMut(&Transaction) -> core::result::Result<(), cryptonote_consensus::ValidationError>,
    {
        let affected: Vec<Hash> = self
            .entries
            .values()
            .filter(|entry| entry.max_used_height > fork_point)
            .map(|entry| entry.tx_hash)
            .collect();

        let mut dropped = Vec::new();
        for hash in affected {
            let Some(entry) = self.entries.get(&hash) else {
                continue;
            };
            if revalidate(&entry.tx).is_err() && !entry.keep_by_block {
                self.remove(&hash);
                dropped.push(hash);
            }
        }
        dropped
    }

    /// Reinserts a transaction discarded along with a popped alt-chain
    /// block, marking it `keep_by_block` so it survives a subsequent
    /// key-image collision or failed re-validation until its longer TTL
    /// expires.
    pub fn reinsert_from_discarded_chain(
        &mut self,
        tx: Transaction,
        tx_hash: Hash,
        blob_size: u64,
        fee: u64,
        receive_time: u64,
        max_used_height: u64,
    ) {
        let _ = self.add_tx(
            tx,
            tx_hash,
            blob_size,
            fee,
            receive_time,
            max_used_height,
            false,
            true,
            Ok(()),
        );
    }

    /// Selects transactions for a new block template.
    ///
    /// Iterates pooled entries in descending fee-per-byte order (ties
    /// broken by ascending receive-time), greedily adding while the running
    /// size stays within `min(budget, 2 * median_size - coinbase_size)`.
    /// Returns the selected hashes in insertion order, plus total size and
    /// fee.
    #[must_use]
    pub fn fill_block_template(&self, median_size: u64, coinbase_size: u64, budget: u64) -> (Vec<Hash>, u64, u64) {
        let cap = budget.min((2 * median_size).saturating_sub(coinbase_size));

        let mut candidates: Vec<&PoolEntry> = self.entries.values().collect();
        candidates.sort_by(|a, b| {
            b.fee_per_byte()
                .cmp(&a.fee_per_byte())
                .then(a.receive_time.cmp(&b.receive_time))
                .then(a.tx_hash.cmp(&b.tx_hash))
        });

        let mut selected = Vec::new();
        let mut total_size = 0u64;
        let mut total_fee = 0u64;
        for entry in candidates {
            let next_size = total_size + entry.blob_size;
            if next_size > cap {
                continue;
            }
            total_size = next_size;
            total_fee += entry.fee;
            selected.push(entry.tx_hash);
        }

        (selected, total_size, total_fee)
    }

    /// Writes the whole pool to `path` atomically, for recovery across
    /// restarts.
    pub fn save(&self, path: &Path) -> cryptonote_storage::Result<()> {
        let snapshot: Vec<PoolEntry> = self.entries.values().cloned().collect();
        cryptonote_storage::snapshot::save(path, &snapshot)
    }

    /// Rebuilds a pool from a snapshot previously written with
    /// [`Self::save`]. Returns an empty pool if `path` does not exist.
    pub fn load(path: &Path) -> cryptonote_storage::Result<Self> {
        let snapshot: Vec<PoolEntry> = cryptonote_storage::snapshot::load(path)?.unwrap_or_default();
        let mut pool = Self::new();
        for entry in snapshot {
            for image in entry.tx.key_images() {
                pool.key_images.insert(*image, entry.tx_hash);
            }
            pool.by_receive_time
                .entry(entry.receive_time)
                .or_default()
                .push(entry.tx_hash);
            for payment_id in payment_ids(&entry.tx) {
                pool.by_payment_id.entry(payment_id).or_default().insert(entry.tx_hash);
            }
            pool.entries.insert(entry.tx_hash, entry);
        }
        Ok(pool)
    }
}

/// Extracts payment ids carried as 8-byte encrypted or 32-byte plaintext
/// nonces in a transaction's `extra` field.
fn payment_ids(tx: &Transaction) -> Vec<Hash> {
    cryptonote_serialization::binary::parse_extra_fields(&tx.extra)
        .into_iter()
        .filter_map(|field| match field {
            cryptonote_types::ExtraField::Nonce(bytes) if bytes.len() == 32 => {
                let mut id = [0u8; 32];
                id.copy_from_slice(&bytes);
                Some(Hash(id))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use cryptonote_types::{Input, Output, OutputTarget};

    use super::*;

    fn tx(key_image: Hash) -> Transaction {
        Transaction {
            version: 2,
            unlock_time: 0,
            inputs: vec![Input::Key {
                amount: 0,
                key_offsets: vec![1],
                key_image,
            }],
            outputs: vec![Output {
                amount: 10,
                target: OutputTarget::Key { key: Hash::ZERO },
            }],
            extra: vec![],
            signatures: vec![],
        }
    }

    #[test]
    fn admits_and_removes_a_transaction() {
        let mut pool = Mempool::new();
        let t = tx(Hash([1; 32]));
        let hash = Hash([9; 32]);
        pool.add_tx(t, hash, 100, 10, 1000, 5, false, false, Ok(())).unwrap();
        assert!(pool.contains(&hash));
        assert_eq!(pool.len(), 1);

        let removed = pool.remove(&hash).unwrap();
        assert_eq!(removed.tx_hash, hash);
        assert!(pool.is_empty());
    }

    #[test]
    fn rejects_pool_double_spend() {
        let mut pool = Mempool::new();
        let image = Hash([2; 32]);
        pool.add_tx(tx(image), Hash([10; 32]), 100, 10, 1000, 5, false, false, Ok(()))
            .unwrap();

        let err = pool
            .add_tx(tx(image), Hash([11; 32]), 100, 10, 1001, 5, false, false, Ok(()))
            .unwrap_err();
        assert_eq!(err, PoolError::DoubleSpend);
    }

    #[test]
    fn keep_by_block_bypasses_double_spend_and_validation() {
        let mut pool = Mempool::new();
        let image = Hash([3; 32]);
        pool.add_tx(tx(image), Hash([12; 32]), 100, 10, 1000, 5, false, false, Ok(()))
            .unwrap();

        pool.add_tx(
            tx(image),
            Hash([13; 32]),
            100,
            10,
            1001,
            5,
            false,
            true,
            Err(cryptonote_consensus::ValidationError::DoubleSpend),
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn fill_template_prefers_higher_fee_per_byte() {
        let mut pool = Mempool::new();
        pool.add_tx(tx(Hash([1; 32])), Hash([21; 32]), 100, 1000, 1000, 5, false, false, Ok(()))
            .unwrap();
        pool.add_tx(tx(Hash([2; 32])), Hash([22; 32]), 100, 100, 999, 5, false, false, Ok(()))
            .unwrap();

        let (selected, total_size, total_fee) = pool.fill_block_template(1_000_000, 100, 1_000_000);
        assert_eq!(selected[0], Hash([21; 32]));
        assert_eq!(total_size, 200);
        assert_eq!(total_fee, 1100);
    }

    #[test]
    fn revalidate_after_reorg_drops_only_entries_above_fork_point() {
        let mut pool = Mempool::new();
        // Depended on a height past the fork point: dropped if revalidation fails.
        pool.add_tx(
            tx(Hash([5; 32])),
            Hash([41; 32]),
            100,
            10,
            1000,
            4,
            false,
            false,
            Ok(()),
        )
        .unwrap();
        // Depended only on the fork point itself, which is retained: left alone.
        pool.add_tx(
            tx(Hash([6; 32])),
            Hash([42; 32]),
            100,
            10,
            1000,
            3,
            false,
            false,
            Ok(()),
        )
        .unwrap();

        let dropped = pool.revalidate_after_reorg(3, |_| Err(cryptonote_consensus::ValidationError::KeyImageAlreadySpent));

        assert_eq!(dropped, vec![Hash([41; 32])]);
        assert!(!pool.contains(&Hash([41; 32])));
        assert!(pool.contains(&Hash([42; 32])));
    }

    #[test]
    fn revalidate_after_reorg_keeps_keep_by_block_entries_on_failure() {
        let mut pool = Mempool::new();
        pool.add_tx(tx(Hash([7; 32])), Hash([43; 32]), 100, 10, 1000, 4, false, true, Ok(()))
            .unwrap();

        let dropped = pool.revalidate_after_reorg(3, |_| Err(cryptonote_consensus::ValidationError::KeyImageAlreadySpent));

        assert!(dropped.is_empty());
        assert!(pool.contains(&Hash([43; 32])));
    }

    #[test]
    fn on_idle_evicts_expired_entries() {
        let mut pool = Mempool::new();
        pool.add_tx(tx(Hash([4; 32])), Hash([31; 32]), 100, 10, 0, 5, false, false, Ok(()))
            .unwrap();
        let evicted = pool.on_idle(MEMPOOL_TX_LIFETIME.as_secs() + 1);
        assert_eq!(evicted, vec![Hash([31; 32])]);
        assert!(pool.is_empty());
    }
}
