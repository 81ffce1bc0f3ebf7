//! C9: the blockchain engine. Owns the paged block store, the block and
//! secondary indexes, the spent-key-image set, the output table, alt-chain
//! tracking and the mempool, behind a single recursive exclusive lock, and
//! drives `add_new_block`'s main-chain-extend / alt-chain / reorganization
//! state machine (spec §4.7).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use cryptonote_consensus::{KeyImageSpent, TxSizeLimit};
use cryptonote_consensus_rules::{CurrencyParameters, DifficultyConfig};
use cryptonote_constants::block::REWARD_BLOCKS_WINDOW;
use cryptonote_constants::money::FEE_PER_BYTE;
use cryptonote_constants::tx::MAX_TX_SIZE;
use cryptonote_types::{Block, BlockEntry, Hash, Transaction};
use parking_lot::ReentrantMutex;
use tracing::{info, warn};

use crate::alt_chain::AltChains;
use crate::block_index::BlockIndex;
use crate::error::{EngineError, Result};
use crate::events::{BlockchainEvent, EventQueue};
use crate::miner_tx;
use crate::output_table::OutputTable;
use crate::secondary_indexes::SecondaryIndexes;

/// Number of (timestamp, block hash) ancestors whose median a candidate's
/// timestamp must exceed.
///
/// Mirrors the reference network's `BLOCKCHAIN_TIMESTAMP_CHECK_WINDOW`.
const TIMESTAMP_CHECK_WINDOW: u64 = 60;

/// How far into the future (relative to `now`) a candidate block's
/// timestamp may be, before it is rejected outright.
///
/// Mirrors the reference network's `CRYPTONOTE_BLOCK_FUTURE_TIME_LIMIT`
/// (two hours at a one-minute block time).
const BLOCK_FUTURE_TIME_LIMIT: u64 = 60 * 60 * 2;

/// Alt branches more than this many blocks behind the current tip are
/// pruned rather than retained indefinitely.
const MAX_ALT_CHAIN_DEPTH: u64 = 2_016;

/// Result of a successful [`Engine::add_new_block`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBlockOutcome {
    /// The block extended the main chain.
    Added {
        /// Its new height.
        height: u64,
    },
    /// The block was already known (main or alt chain); a no-op.
    AlreadyExists,
    /// The block was stored as a new alt-chain tip; not enough work yet to
    /// trigger a reorganization.
    AddedToAltChain,
    /// A reorganization promoted an alt branch to the main chain.
    ChainSwitched {
        /// Height the two chains diverged at.
        fork_height: u64,
        /// Hash of the new main-chain tip.
        new_tip: Hash,
    },
}

/// Context a candidate block is validated against: everything that would
/// otherwise be read off "the current main chain" generalized so the same
/// validation code handles both a main-chain extend and an alt-chain
/// arrival.
struct BlockContext {
    height: u64,
    prev_cumulative_difficulty: u128,
    prev_cumulative_size: u64,
    already_generated_coins: u64,
    median_size: u64,
    required_difficulty: u128,
    timestamp_median: Option<u64>,
}

fn hash_block(block: &Block) -> Hash {
    let bytes = cryptonote_serialization::binary::to_vec(block);
    Hash(*blake3::hash(&bytes).as_bytes())
}

/// The hash ring signatures are verified against: the transaction encoded
/// with its `signatures` cleared, so the hash a signer signs over doesn't
/// depend on the signature it's about to produce.
fn signature_prefix_hash(tx: &Transaction) -> Hash {
    let mut prefix = tx.clone();
    prefix.signatures.clear();
    let bytes = cryptonote_serialization::binary::to_vec(&prefix);
    Hash(*blake3::hash(&bytes).as_bytes())
}

/// Everything the engine's lock protects.
struct EngineState {
    store: cryptonote_storage::PagedStore<BlockEntry>,
    block_index: BlockIndex,
    secondary: SecondaryIndexes,
    checkpoints: cryptonote_consensus_rules::Checkpoints,
    currency: CurrencyParameters,
    difficulty_config: DifficultyConfig,
    hard_fork_schedule: Vec<(u64, u8)>,
    outputs: OutputTable,
    spent_key_images: HashSet<Hash>,
    alt_chains: AltChains,
    mempool: cryptonote_txpool::Mempool,
    events: EventQueue,
    indices_path: PathBuf,
    pool_path: PathBuf,
}

impl EngineState {
    fn top_height(&self) -> Option<u64> {
        self.block_index.top_height()
    }

    fn expected_major_version(&self, height: u64) -> u8 {
        self.hard_fork_schedule
            .iter()
            .rev()
            .find(|(activation, _)| *activation <= height)
            .map_or(1, |(_, version)| *version)
    }

    /// Returns the [`BlockEntry`] for `hash`, checking alt chains first
    /// (cheap hash lookup) and falling back to the main chain store.
    fn entry_for(&mut self, hash: &Hash) -> Result<Option<BlockEntry>> {
        if let Some(entry) = self.alt_chains.get(hash) {
            return Ok(Some(entry.clone()));
        }
        if let Some(height) = self.block_index.height_of(hash) {
            let entry = self.store.get(height as usize)?;
            return Ok(Some((*entry).clone()));
        }
        Ok(None)
    }

    /// Walks backward from (and including) `hash`, collecting up to `count`
    /// ancestor entries in ascending-height order. Used to derive the
    /// difficulty and median-size windows for both main-chain and alt-chain
    /// validation from the same code path.
    fn window_ending_at(&mut self, hash: Hash, count: u64) -> Result<Vec<BlockEntry>> {
        let mut entries = Vec::new();
        let mut current = hash;
        loop {
            if entries.len() as u64 >= count {
                break;
            }
            let Some(entry) = self.entry_for(&current)? else {
                break;
            };
            let prev = entry.block.header.previous_block_hash;
            let is_genesis = entry.block.coinbase_height() == Some(0);
            entries.push(entry);
            if is_genesis {
                break;
            }
            current = prev;
        }
        entries.reverse();
        Ok(entries)
    }

    /// Builds the validation context for a candidate block extending
    /// `parent_hash`.
    fn context_for_child_of(&mut self, parent_hash: Hash) -> Result<BlockContext> {
        let parent = self.entry_for(&parent_hash)?;

        let (prev_cumulative_difficulty, prev_cumulative_size, already_generated_coins, height) = match &parent {
            Some(entry) => (
                entry.cumulative_difficulty,
                entry.cumulative_size,
                entry.already_generated_coins,
                entry.block.coinbase_height().unwrap_or(0) + 1,
            ),
            None => (0, 0, 0, 0),
        };

        let difficulty_window = self.window_ending_at(
            parent_hash,
            self.difficulty_config.required_samples(),
        )?;
        let timestamps: Vec<u64> = difficulty_window
            .iter()
            .map(|e| e.block.header.timestamp)
            .collect();
        let cumulative: Vec<u128> = difficulty_window.iter().map(|e| e.cumulative_difficulty).collect();
        let required_difficulty = cryptonote_consensus_rules::next_difficulty(
            &timestamps,
            &cumulative,
            self.difficulty_config.target_seconds,
            self.difficulty_config.window,
            self.difficulty_config.cut,
            self.difficulty_config.lag,
        );

        let size_window = self.window_ending_at(parent_hash, REWARD_BLOCKS_WINDOW)?;
        let mut sizes: Vec<u64> = size_window.iter().map(|e| e.block_size).collect();
        sizes.sort_unstable();
        let median_size = if sizes.is_empty() {
            0
        } else {
            cryptonote_helper::num::median(sizes)
        };

        let timestamp_window = self.window_ending_at(parent_hash, TIMESTAMP_CHECK_WINDOW)?;
        let timestamp_median = if timestamp_window.is_empty() {
            None
        } else {
            let mut stamps: Vec<u64> = timestamp_window.iter().map(|e| e.block.header.timestamp).collect();
            stamps.sort_unstable();
            Some(cryptonote_helper::num::median(stamps))
        };

        Ok(BlockContext {
            height,
            prev_cumulative_difficulty,
            prev_cumulative_size,
            already_generated_coins,
            median_size,
            required_difficulty,
            timestamp_median,
        })
    }

    /// Runs main chain extend's ordered checks (spec §4.7.2) against
    /// `block`/`ctx`, resolving non-coinbase transactions from the mempool
    /// first, then `supplied_txs`. Does not mutate any engine state; on
    /// success returns the fully-formed [`BlockEntry`] ready to commit.
    /// `pow_hash` of `None` skips the proof-of-work check — used when
    /// replaying an alt-chain block during a chain switch, since its PoW was
    /// already checked once when the block was first admitted to the alt
    /// chain and the external hash is not re-derivable from a stored
    /// [`BlockEntry`] alone.
    fn validate_block(
        &mut self,
        block: Block,
        id: Hash,
        ctx: &BlockContext,
        pow_hash: Option<&Hash>,
        now: u64,
        supplied_txs: &HashMap<Hash, Transaction>,
    ) -> Result<BlockEntry> {
        // 1. hard-fork version.
        let expected_major = self.expected_major_version(ctx.height);
        if block.header.major_version != expected_major {
            return Err(EngineError::WrongVersion {
                major: block.header.major_version,
                minor: block.header.minor_version,
                height: ctx.height,
            });
        }

        // 2. timestamp.
        if let Some(median) = ctx.timestamp_median {
            if block.header.timestamp <= median {
                return Err(EngineError::TimestampTooOld {
                    timestamp: block.header.timestamp,
                    median,
                });
            }
        }
        let future_limit = now + BLOCK_FUTURE_TIME_LIMIT;
        if block.header.timestamp > future_limit {
            return Err(EngineError::TimestampTooNew {
                timestamp: block.header.timestamp,
                limit: future_limit,
            });
        }

        // 3. proof of work.
        if let Some(pow_hash) = pow_hash {
            if !cryptonote_consensus_rules::hash_meets_difficulty(pow_hash, ctx.required_difficulty) {
                return Err(EngineError::InsufficientProofOfWork(ctx.required_difficulty));
            }
        }

        // 4. miner transaction shape.
        miner_tx::prevalidate_miner_transaction(
            &block.miner_tx,
            ctx.height,
            self.currency.mined_money_unlock_window,
        )?;

        // 5. resolve and validate every named transaction.
        let mut transactions = Vec::with_capacity(block.tx_hashes.len());
        let mut total_fees = 0u64;
        let mut blob_size = cryptonote_serialization::binary::to_vec(&block.header).len() as u64
            + cryptonote_serialization::binary::to_vec(&block.miner_tx).len() as u64;

        self.outputs.set_reference(ctx.height, block.header.timestamp);

        for tx_hash in &block.tx_hashes {
            let tx = self
                .mempool
                .get(tx_hash)
                .map(|entry| entry.tx.clone())
                .or_else(|| supplied_txs.get(tx_hash).cloned())
                .ok_or(EngineError::MissingTransaction(*tx_hash))?;

            let tx_bytes = cryptonote_serialization::binary::to_vec(&tx);
            blob_size += tx_bytes.len() as u64;
            let prefix_hash = signature_prefix_hash(&tx);

            let limits = SizeLimits {
                max_tx_size: MAX_TX_SIZE,
                fee_per_byte: FEE_PER_BYTE,
            };
            let key_images = SpentKeyImages(&self.spent_key_images);

            let validated = cryptonote_consensus::validate_transaction(
                &tx,
                &prefix_hash,
                tx_bytes.len() as u64,
                &self.outputs,
                &key_images,
                &limits,
            )?;
            total_fees = total_fees.saturating_add(validated.fee);
            transactions.push(tx);
        }

        // 6. cumulative size.
        let cumulative_size = ctx.prev_cumulative_size + blob_size;
        let max_size = cryptonote_consensus_rules::max_block_cumulative_size(&self.currency, ctx.height);
        if blob_size > max_size {
            return Err(EngineError::BlockTooLarge {
                actual: blob_size,
                max: max_size,
            });
        }

        // 7. reward.
        let total_reward = miner_tx::check_miner_tx_reward(
            &block.miner_tx,
            &self.currency,
            ctx.median_size,
            blob_size,
            ctx.already_generated_coins,
            total_fees,
        )?;
        let minted = total_reward.saturating_sub(total_fees);

        // 8. checkpoint.
        if let Some(expected_hash) = self.checkpoints.hash_at(ctx.height) {
            if expected_hash != id {
                return Err(EngineError::CheckpointMismatch { height: ctx.height });
            }
        }

        let output_indices = self.assign_output_indices(&block, &transactions);

        Ok(BlockEntry {
            block,
            id,
            cumulative_difficulty: ctx.prev_cumulative_difficulty + ctx.required_difficulty,
            already_generated_coins: ctx.already_generated_coins + minted,
            block_size: blob_size,
            cumulative_size,
            transactions,
            output_indices,
        })
    }

    /// Computes, but does not yet commit, the global output index each
    /// output of the coinbase and every included transaction would be
    /// assigned — used both to populate `BlockEntry::output_indices` and,
    /// on commit, to actually push them into the output table.
    fn assign_output_indices(&self, block: &Block, transactions: &[Transaction]) -> Vec<Vec<u64>> {
        let mut next_index: HashMap<u64, u64> = HashMap::new();
        let mut result = Vec::with_capacity(transactions.len() + 1);

        let mut assign_for = |outputs: &[cryptonote_types::Output]| -> Vec<u64> {
            outputs
                .iter()
                .map(|out| {
                    let current = self.outputs.output_count(out.amount).unwrap_or(0)
                        + *next_index.get(&out.amount).unwrap_or(&0);
                    *next_index.entry(out.amount).or_insert(0) += 1;
                    current
                })
                .collect()
        };

        result.push(assign_for(&block.miner_tx.outputs));
        for tx in transactions {
            result.push(assign_for(&tx.outputs));
        }
        result
    }

    /// Pushes a validated [`BlockEntry`] onto the main chain, updating every
    /// index, the spent-key-image set, the output table and the mempool.
    fn commit_main_extend(&mut self, entry: BlockEntry) -> Result<()> {
        let height = entry.block.coinbase_height().ok_or_else(|| {
            EngineError::InternalInconsistency("committed entry has no coinbase height".to_owned())
        })?;

        for output in &entry.block.miner_tx.outputs {
            self.outputs.push(
                output.amount,
                crate::output_table::OutputRecord {
                    target: output.target.clone(),
                    unlock_time: entry.block.miner_tx.unlock_time,
                    height,
                },
            );
        }
        let mut payment_id_pairs = Vec::new();
        for (tx_hash, tx) in entry.block.tx_hashes.iter().zip(entry.transactions.iter()) {
            for output in &tx.outputs {
                self.outputs.push(
                    output.amount,
                    crate::output_table::OutputRecord {
                        target: output.target.clone(),
                        unlock_time: tx.unlock_time,
                        height,
                    },
                );
            }
            for key_image in tx.key_images() {
                self.spent_key_images.insert(*key_image);
            }
            for field in cryptonote_serialization::binary::parse_extra_fields(&tx.extra) {
                if let cryptonote_types::ExtraField::Nonce(bytes) = field {
                    if bytes.len() == 32 {
                        let mut id = [0u8; 32];
                        id.copy_from_slice(&bytes);
                        payment_id_pairs.push((Hash(id), *tx_hash));
                    }
                }
            }
            self.mempool.remove(tx_hash);
        }

        self.secondary.record_block(
            height,
            entry.id,
            entry.block.header.timestamp,
            &payment_id_pairs,
            entry.transactions.len() as u64,
        );

        self.block_index.push(entry.id);
        self.store.push_back(&entry)?;
        self.events.push(BlockchainEvent::BlockAdded { hash: entry.id, height });

        info!(height, id = %entry.id, "block added to main chain");
        Ok(())
    }

    /// Reverses [`Self::commit_main_extend`] for the current tip, returning
    /// the popped entry so its non-coinbase transactions can be offered
    /// back to the mempool.
    fn pop_main_tip(&mut self) -> Result<BlockEntry> {
        let height = self.top_height().ok_or_else(|| {
            EngineError::InternalInconsistency("pop_main_tip called on an empty chain".to_owned())
        })?;
        let entry = (*self.store.back()?).clone();

        for output in &entry.block.miner_tx.outputs {
            self.outputs.pop(output.amount);
        }
        let mut payment_id_pairs = Vec::new();
        for (tx_hash, tx) in entry.block.tx_hashes.iter().zip(entry.transactions.iter()) {
            for output in &tx.outputs {
                self.outputs.pop(output.amount);
            }
            for key_image in tx.key_images() {
                self.spent_key_images.remove(key_image);
            }
            for field in cryptonote_serialization::binary::parse_extra_fields(&tx.extra) {
                if let cryptonote_types::ExtraField::Nonce(bytes) = field {
                    if bytes.len() == 32 {
                        let mut id = [0u8; 32];
                        id.copy_from_slice(&bytes);
                        payment_id_pairs.push((Hash(id), *tx_hash));
                    }
                }
            }
        }

        self.secondary
            .remove_block(height, entry.id, entry.block.header.timestamp, &payment_id_pairs);
        self.store.pop_back()?;
        self.block_index.pop();

        Ok(entry)
    }

    fn handle_alt_chain(
        &mut self,
        block: Block,
        id: Hash,
        pow_hash: Hash,
        now: u64,
        supplied_txs: &HashMap<Hash, Transaction>,
    ) -> Result<AddBlockOutcome> {
        let parent = block.header.previous_block_hash;
        let ctx = self.context_for_child_of(parent)?;

        let entry = self.validate_block(block, id, &ctx, Some(&pow_hash), now, supplied_txs)?;
        self.secondary.add_orphan(ctx.height, id);
        self.alt_chains.insert(entry);

        let top_height = self.top_height().unwrap_or(0);
        let Some(branch) = self
            .alt_chains
            .branch_to_main_ancestor(id, &self.block_index, MAX_ALT_CHAIN_DEPTH)
        else {
            return Ok(AddBlockOutcome::AddedToAltChain);
        };

        if !self.checkpoints.is_allowed(branch.fork_height + 1, top_height) {
            return Err(EngineError::CheckpointViolation(branch.fork_height + 1));
        }

        let main_tip_difficulty = self
            .entry_for(&self.block_index.hash_at(top_height).unwrap_or(Hash::ZERO))?
            .map_or(0, |e| e.cumulative_difficulty);

        if branch.tip_cumulative_difficulty() <= main_tip_difficulty {
            return Ok(AddBlockOutcome::AddedToAltChain);
        }

        self.switch_to_alt_branch(branch, now, supplied_txs)
    }

    fn switch_to_alt_branch(
        &mut self,
        branch: crate::alt_chain::AltBranch,
        now: u64,
        supplied_txs: &HashMap<Hash, Transaction>,
    ) -> Result<AddBlockOutcome> {
        let mut popped = Vec::new();
        while self.top_height().unwrap_or(0) > branch.fork_height && !self.block_index.is_empty() {
            popped.push(self.pop_main_tip()?);
        }

        for entry in &popped {
            for (tx_hash, tx) in entry.block.tx_hashes.iter().zip(entry.transactions.iter()) {
                let tx_bytes = cryptonote_serialization::binary::to_vec(tx);
                self.mempool.reinsert_from_discarded_chain(
                    tx.clone(),
                    *tx_hash,
                    tx_bytes.len() as u64,
                    0,
                    now,
                    entry.block.coinbase_height().unwrap_or(0),
                );
            }
        }

        let mut applied = Vec::new();
        for alt_entry in &branch.blocks {
            let parent_hash = alt_entry.block.header.previous_block_hash;
            let ctx = match self.context_for_child_of(parent_hash) {
                Ok(ctx) => ctx,
                Err(e) => {
                    self.rollback_failed_switch(popped, applied);
                    return Err(e);
                }
            };
            match self.validate_block(
                alt_entry.block.clone(),
                alt_entry.id,
                &ctx,
                None,
                now,
                supplied_txs,
            ) {
                Ok(entry) => {
                    if let Err(e) = self.commit_main_extend(entry) {
                        self.rollback_failed_switch(popped, applied);
                        return Err(e);
                    }
                    applied.push(alt_entry.id);
                }
                Err(e) => {
                    warn!(error = %e, "alt branch failed re-validation during switch, rolling back");
                    self.rollback_failed_switch(popped, applied);
                    return Err(e);
                }
            }
        }

        for id in &applied {
            self.alt_chains.remove(id);
        }
        let keep: HashSet<Hash> = HashSet::new();
        let prune_height = self.top_height().unwrap_or(0).saturating_sub(MAX_ALT_CHAIN_DEPTH);
        self.alt_chains.prune_below(prune_height, &keep);

        self.outputs.set_reference(self.top_height().unwrap_or(0), now);
        let key_images = SpentKeyImages(&self.spent_key_images);
        let dropped = self.mempool.revalidate_after_reorg(branch.fork_height, |tx| {
            let prefix_hash = signature_prefix_hash(tx);
            cryptonote_consensus::check_inputs(tx, &prefix_hash, &self.outputs, &key_images).map(|_| ())
        });
        if !dropped.is_empty() {
            info!(count = dropped.len(), "dropped mempool transactions invalidated by reorg");
        }

        let new_tip = branch.blocks.last().map(|e| e.id).unwrap_or(branch.fork_hash);
        self.events.push(BlockchainEvent::ChainSwitched {
            fork_height: branch.fork_height,
            new_main_chain: branch.blocks.iter().map(|e| e.id).collect(),
        });

        Ok(AddBlockOutcome::ChainSwitched {
            fork_height: branch.fork_height,
            new_tip,
        })
    }

    /// Re-pushes the blocks popped during a failed switch attempt, restoring
    /// the main chain to its pre-switch state. Any alt blocks that did
    /// commit before the failure are popped back off first.
    fn rollback_failed_switch(&mut self, popped: Vec<BlockEntry>, applied: Vec<Hash>) {
        for _ in &applied {
            if self.pop_main_tip().is_err() {
                warn!("failed to roll back a partially-applied chain switch");
                return;
            }
        }
        for entry in popped.into_iter().rev() {
            if self.commit_main_extend(entry).is_err() {
                warn!("failed to restore a popped main-chain block during rollback");
                return;
            }
        }
    }
}

struct SpentKeyImages<'a>(&'a HashSet<Hash>);

impl KeyImageSpent for SpentKeyImages<'_> {
    fn is_spent(&self, key_image: &Hash) -> cryptonote_consensus::Result<bool> {
        Ok(self.0.contains(key_image))
    }
}

struct SizeLimits {
    max_tx_size: u64,
    fee_per_byte: u64,
}

impl TxSizeLimit for SizeLimits {
    fn max_tx_size(&self) -> u64 {
        self.max_tx_size
    }

    fn required_fee_per_byte(&self) -> u64 {
        self.fee_per_byte
    }
}

/// The blockchain engine: the single entry point external callers (peer
/// sync, the miner, wallets via RPC) drive.
///
/// Wrapped in a [`ReentrantMutex`] so a notification callback invoked while
/// still holding the lock (spec §5's ordering guarantee) can call back into
/// read operations without deadlocking; the `RefCell` supplies the interior
/// mutability a reentrant lock's shared borrow doesn't.
pub struct Engine {
    state: ReentrantMutex<RefCell<EngineState>>,
}

impl Engine {
    /// Opens (creating if necessary) an engine rooted at `data_dir`.
    pub fn open(
        data_dir: &Path,
        currency: CurrencyParameters,
        checkpoints: cryptonote_consensus_rules::Checkpoints,
        difficulty_config: DifficultyConfig,
        hard_fork_schedule: Vec<(u64, u8)>,
        pool_size: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(cryptonote_storage::StorageError::from)?;

        let mut store = cryptonote_storage::PagedStore::open(
            &data_dir.join("blocks.dat"),
            &data_dir.join("blockindexes.dat"),
            pool_size,
        )?;

        let indices_path = data_dir.join("blockchainindices.dat");
        let pool_path = data_dir.join("poolstate.bin");

        let secondary = cryptonote_storage::snapshot::load(&indices_path)?.unwrap_or_default();
        let mempool = cryptonote_txpool::Mempool::load(&pool_path)?;

        let mut block_index = BlockIndex::new();
        let mut outputs = OutputTable::new();
        let mut spent_key_images = HashSet::new();
        for i in 0..store.size() {
            let entry = store.get(i)?;
            block_index.push(entry.id);
            for output in &entry.block.miner_tx.outputs {
                outputs.push(
                    output.amount,
                    crate::output_table::OutputRecord {
                        target: output.target.clone(),
                        unlock_time: entry.block.miner_tx.unlock_time,
                        height: i as u64,
                    },
                );
            }
            for tx in &entry.transactions {
                for output in &tx.outputs {
                    outputs.push(
                        output.amount,
                        crate::output_table::OutputRecord {
                            target: output.target.clone(),
                            unlock_time: tx.unlock_time,
                            height: i as u64,
                        },
                    );
                }
                for key_image in tx.key_images() {
                    spent_key_images.insert(*key_image);
                }
            }
        }

        let state = EngineState {
            store,
            block_index,
            secondary,
            checkpoints,
            currency,
            difficulty_config,
            hard_fork_schedule,
            outputs,
            spent_key_images,
            alt_chains: AltChains::new(),
            mempool,
            events: EventQueue::new(),
            indices_path,
            pool_path,
        };

        Ok(Self {
            state: ReentrantMutex::new(RefCell::new(state)),
        })
    }

    /// Attempts to add `block` to the chain, resolving its transactions from
    /// the mempool first and `supplied_txs` second. `pow_hash` is the
    /// proof-of-work hash for this block header, computed externally (the
    /// hashing algorithm itself is a pluggable, external concern). `now` is
    /// the caller's current time, threaded through explicitly so the check
    /// is deterministic and testable.
    pub fn add_new_block(
        &self,
        block: Block,
        pow_hash: Hash,
        now: u64,
        supplied_txs: HashMap<Hash, Transaction>,
    ) -> Result<AddBlockOutcome> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        let id = hash_block(&block);
        if state.block_index.contains(&id) || state.alt_chains.contains(&id) {
            return Ok(AddBlockOutcome::AlreadyExists);
        }

        let prev = block.header.previous_block_hash;
        let top_hash = state.top_height().and_then(|h| state.block_index.hash_at(h));
        let is_genesis = state.block_index.is_empty();

        if is_genesis {
            if prev != Hash::ZERO {
                return Err(EngineError::Orphan(prev));
            }
            let ctx = state.context_for_child_of(prev)?;
            let entry = state.validate_block(block, id, &ctx, Some(&pow_hash), now, &supplied_txs)?;
            state.commit_main_extend(entry)?;
            return Ok(AddBlockOutcome::Added { height: 0 });
        }

        if Some(prev) == top_hash {
            let ctx = state.context_for_child_of(prev)?;
            let height = ctx.height;
            let entry = state.validate_block(block, id, &ctx, Some(&pow_hash), now, &supplied_txs)?;
            state.commit_main_extend(entry)?;
            state.mempool.on_idle(now);
            return Ok(AddBlockOutcome::Added { height });
        }

        if state.block_index.contains(&prev) || state.alt_chains.contains(&prev) {
            return state.handle_alt_chain(block, id, pow_hash, now, &supplied_txs);
        }

        Err(EngineError::Orphan(prev))
    }

    /// Copies `count` consecutive [`BlockEntry`] records starting at
    /// `offset`.
    pub fn get_blocks(&self, offset: u64, count: u64) -> Result<Vec<BlockEntry>> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let mut out = Vec::new();
        for i in offset..offset.saturating_add(count) {
            if i >= state.store.size() as u64 {
                break;
            }
            out.push((*state.store.get(i as usize)?).clone());
        }
        Ok(out)
    }

    /// The main chain's current tip height, if any blocks are applied.
    pub fn top_height(&self) -> Option<u64> {
        let guard = self.state.lock();
        guard.borrow().top_height()
    }

    /// Builds the exponential-backoff sparse chain used by peer handshakes.
    pub fn build_sparse_chain(&self) -> Vec<Hash> {
        let guard = self.state.lock();
        guard.borrow().block_index.build_sparse_chain()
    }

    /// Reconciles a peer's sparse chain against ours, returning the height
    /// of the highest id we recognise, our own tip height, and the
    /// resulting start height to resume supplying blocks from.
    pub fn find_blockchain_supplement(&self, remote_ids: &[Hash]) -> (Option<u64>, u64, u64) {
        let guard = self.state.lock();
        let state = guard.borrow();
        let our_tip = state.top_height().unwrap_or(0);

        let known = remote_ids.iter().find_map(|id| state.block_index.height_of(id));
        let start_height = known.map_or(0, |h| h + 1);
        (known, our_tip, start_height)
    }

    /// Samples `count` distinct, currently-unlocked global indexes for
    /// `amount`.
    pub fn get_random_outs_for_amounts(
        &self,
        amount: u64,
        count: usize,
    ) -> core::result::Result<Vec<u64>, crate::random_outs::InsufficientOutputs> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let height = state.top_height().unwrap_or(0);
        let timestamp = state
            .entry_for(&state.block_index.hash_at(height).unwrap_or(Hash::ZERO))
            .ok()
            .flatten()
            .map_or(0, |e| e.block.header.timestamp);
        let mut rng = rand::thread_rng();
        crate::random_outs::get_random_outs_for_amounts(&state.outputs, &mut rng, amount, count, height, timestamp)
    }

    /// Submits a transaction for mempool admission, running the full
    /// stateful validator against current chain state.
    pub fn submit_transaction(
        &self,
        tx: Transaction,
        tx_hash: Hash,
        receive_time: u64,
        keep_by_block: bool,
    ) -> Result<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        // This engine keeps no global confirmed-transaction-hash index, only
        // the spent-key-image set; a transaction already on the main chain
        // is caught by `check_inputs`' `KeyImageAlreadySpent` instead.
        let already_in_chain = false;

        let tx_bytes = cryptonote_serialization::binary::to_vec(&tx);
        let prefix_hash = signature_prefix_hash(&tx);
        let height = state.top_height().unwrap_or(0);
        let timestamp = state
            .entry_for(&state.block_index.hash_at(height).unwrap_or(Hash::ZERO))
            .ok()
            .flatten()
            .map_or(0, |e| e.block.header.timestamp);
        state.outputs.set_reference(height, timestamp);

        let limits = SizeLimits {
            max_tx_size: MAX_TX_SIZE,
            fee_per_byte: FEE_PER_BYTE,
        };
        let key_images = SpentKeyImages(&state.spent_key_images);
        let validation = cryptonote_consensus::validate_transaction(
            &tx,
            &prefix_hash,
            tx_bytes.len() as u64,
            &state.outputs,
            &key_images,
            &limits,
        );

        let (max_used_height, fee) = match &validation {
            Ok(v) => (v.max_used_block_height, v.fee),
            Err(_) => (0, 0),
        };
        let validation_result = validation.map(|_| ());

        state.mempool.add_tx(
            tx,
            tx_hash,
            tx_bytes.len() as u64,
            fee,
            receive_time,
            max_used_height,
            already_in_chain,
            keep_by_block,
            validation_result,
        )?;
        state.events.push(BlockchainEvent::PoolUpdated { tx_hash });
        Ok(())
    }

    /// Selects transactions for a new block template at the current tip.
    pub fn fill_block_template(&self, coinbase_size: u64) -> (Vec<Hash>, u64, u64) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let height = state.top_height().map_or(0, |h| h + 1);
        let median_window_parent = state.block_index.hash_at(state.top_height().unwrap_or(0));
        let median_size = median_window_parent
            .and_then(|hash| state.window_ending_at(hash, REWARD_BLOCKS_WINDOW).ok())
            .map(|window| {
                let mut sizes: Vec<u64> = window.iter().map(|e| e.block_size).collect();
                sizes.sort_unstable();
                if sizes.is_empty() {
                    0
                } else {
                    cryptonote_helper::num::median(sizes)
                }
            })
            .unwrap_or(0);
        let budget = cryptonote_consensus_rules::max_block_cumulative_size(&state.currency, height);
        state.mempool.fill_block_template(median_size, coinbase_size, budget)
    }

    /// Drains every event queued since the last call.
    pub fn drain_events(&self) -> Vec<BlockchainEvent> {
        let guard = self.state.lock();
        guard.borrow_mut().events.drain()
    }

    /// Persists the secondary indexes and mempool snapshot to disk.
    pub fn save_snapshots(&self) -> Result<()> {
        let guard = self.state.lock();
        let state = guard.borrow();
        cryptonote_storage::snapshot::save(&state.indices_path, &state.secondary)?;
        state.mempool.save(&state.pool_path)?;
        Ok(())
    }
}
