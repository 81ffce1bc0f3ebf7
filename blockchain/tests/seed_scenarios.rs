//! End-to-end scenarios against the full [`Engine`]: extending the main
//! chain, pool double-spend rejection, a reorganization, a checkpoint
//! mismatch, a coinbase that would overflow `MONEY_SUPPLY`, and sampling
//! decoy outputs.

use std::collections::HashMap;

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::scalar::Scalar;
use rand::SeedableRng;

use cryptonote_blockchain::{AddBlockOutcome, Engine};
use cryptonote_consensus_rules::{CurrencyParameters, DifficultyConfig};
use cryptonote_types::{
    Block, BlockHeader, Hash, Input, Output, OutputTarget, RingSignature, Transaction,
};

/// Reward stays pinned at `final_subsidy_per_minute` for the whole test
/// chain (`money_supply >> 63` is far below the floor), so every
/// txless block has an identical, independently-computable size and the
/// reward formula never needs iterating to a fixed point.
fn test_currency() -> CurrencyParameters {
    CurrencyParameters {
        emission_speed_factor: 63,
        mined_money_unlock_window: 1,
        ..CurrencyParameters::mainnet()
    }
}

fn open_engine(dir: &std::path::Path, currency: CurrencyParameters) -> Engine {
    Engine::open(
        dir,
        currency,
        cryptonote_consensus_rules::Checkpoints::new(),
        DifficultyConfig::with_target(120),
        Vec::new(),
        16,
    )
    .expect("engine opens on a fresh data dir")
}

fn coinbase_tx(height: u64, amount: u64, unlock_time: u64, miner_pubkey: Hash) -> Transaction {
    Transaction {
        version: 2,
        unlock_time,
        inputs: vec![Input::Coinbase { height }],
        // Padding keeps every block comfortably larger than a single
        // spending transaction, so the one block in scenario 3 that
        // carries a real transaction never trips the "more than double
        // the median" size-penalty cutoff.
        outputs: vec![Output {
            amount,
            target: OutputTarget::Key { key: miner_pubkey },
        }],
        extra: vec![0u8; 256],
        signatures: vec![],
    }
}

/// Bookkeeping an external caller of `Engine::add_new_block` would keep for
/// itself: the running size/emission totals the engine derives from the
/// store, mirrored here so test blocks can be built with exactly the
/// coinbase reward `check_miner_tx_reward` will demand.
struct ChainBuilder {
    currency: CurrencyParameters,
    sizes: Vec<u64>,
    already_generated_coins: u64,
    /// One-time key every coinbase output in this chain is minted to.
    miner_pubkey: Hash,
}

impl ChainBuilder {
    fn new(currency: CurrencyParameters) -> Self {
        Self {
            currency,
            sizes: Vec::new(),
            already_generated_coins: 0,
            miner_pubkey: Hash::ZERO,
        }
    }

    fn with_miner_pubkey(mut self, pubkey: Hash) -> Self {
        self.miner_pubkey = pubkey;
        self
    }

    fn median_size(&self) -> u64 {
        if self.sizes.is_empty() {
            return 0;
        }
        let mut sorted = self.sizes.clone();
        sorted.sort_unstable();
        cryptonote_helper::num::median(sorted)
    }

    /// Builds the next block on top of `prev`, at `height`, with the given
    /// timestamp and extra transactions (hash, tx, fee). Returns the block
    /// and updates the builder's running totals as if it had just been
    /// committed.
    fn next_block(
        &mut self,
        prev: Hash,
        height: u64,
        timestamp: u64,
        txs: &[(Hash, Transaction, u64)],
    ) -> Block {
        let header = BlockHeader {
            major_version: 1,
            minor_version: 0,
            timestamp,
            previous_block_hash: prev,
            nonce: 0,
        };
        let header_len = cryptonote_serialization::binary::to_vec(&header).len() as u64;
        let tx_bytes_len: u64 = txs
            .iter()
            .map(|(_, tx, _)| cryptonote_serialization::binary::to_vec(tx).len() as u64)
            .sum();
        let total_fees: u64 = txs.iter().map(|(_, _, fee)| *fee).sum();
        let unlock_time = height + self.currency.mined_money_unlock_window;

        // First pass: measure with a guessed amount of the same order of
        // magnitude the real reward will have, to size the miner_tx.
        let guess = self.currency.final_subsidy_per_minute.saturating_add(total_fees);
        let miner_tx_guess = coinbase_tx(height, guess, unlock_time, self.miner_pubkey);
        let miner_len_guess = cryptonote_serialization::binary::to_vec(&miner_tx_guess).len() as u64;
        let current_size_guess = header_len + miner_len_guess + tx_bytes_len;

        let median_size = self.median_size();
        let expected_reward = cryptonote_consensus_rules::block_reward(
            &self.currency,
            median_size,
            current_size_guess,
            self.already_generated_coins,
            total_fees,
        )
        .expect("test block never exceeds the double-median cap");

        let miner_tx = coinbase_tx(height, expected_reward, unlock_time, self.miner_pubkey);
        let miner_len = cryptonote_serialization::binary::to_vec(&miner_tx).len() as u64;
        let current_size = header_len + miner_len + tx_bytes_len;

        self.sizes.push(current_size);
        self.already_generated_coins += expected_reward.saturating_sub(total_fees);

        Block {
            header,
            miner_tx,
            tx_hashes: txs.iter().map(|(hash, _, _)| *hash).collect(),
        }
    }
}

// -- single-member ring signing, matching `cryptonote_consensus::signatures`'s
// -- verifier exactly (try-and-increment key-image base point, Schnorr-style
// -- closing scalar over the transaction's signature-prefix hash). A ring of
// -- size 1 is the degenerate case of the general construction: the one
// -- "decoy" is the real spender.

fn hash_to_point(pubkey: &Hash) -> curve25519_dalek::edwards::EdwardsPoint {
    let mut counter: u8 = 0;
    loop {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&pubkey.0);
        hasher.update(&[counter]);
        let digest = *hasher.finalize().as_bytes();
        if let Some(point) = curve25519_dalek::edwards::CompressedEdwardsY(digest).decompress() {
            return point.mul_by_cofactor();
        }
        counter = counter.wrapping_add(1);
    }
}

fn hash_to_scalar(bytes: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(*blake3::hash(bytes).as_bytes())
}

fn keypair(seed: &[u8]) -> (Scalar, Hash) {
    let secret = Scalar::from_bytes_mod_order(*blake3::hash(seed).as_bytes());
    let public = (ED25519_BASEPOINT_POINT * secret).compress().to_bytes();
    (secret, Hash(public))
}

fn key_image_of(secret: &Scalar, pubkey: &Hash) -> Hash {
    let image = hash_to_point(pubkey) * secret;
    Hash(image.compress().to_bytes())
}

fn sign_single_member_ring(prefix_hash: &Hash, secret: &Scalar, pubkey: &Hash, nonce_seed: u64) -> RingSignature {
    let hp = hash_to_point(pubkey);
    let q = Scalar::from_bytes_mod_order(*blake3::hash(&nonce_seed.to_le_bytes()).as_bytes());

    let l = ED25519_BASEPOINT_POINT * q;
    let r_point = hp * q;

    let mut buf = Vec::with_capacity(32 + 64);
    buf.extend_from_slice(&prefix_hash.0);
    buf.extend_from_slice(l.compress().as_bytes());
    buf.extend_from_slice(r_point.compress().as_bytes());
    let c = hash_to_scalar(&buf);
    let r = q - c * secret;

    RingSignature {
        members: vec![(Hash(c.to_bytes()), Hash(r.to_bytes()))],
    }
}

/// Builds a one-input, one-output transaction spending `input_amount` at
/// `ring_global_index` from the output owned by `secret`/`pubkey`, paying
/// `fee` to the block it lands in.
fn spend_tx(secret: &Scalar, pubkey: &Hash, input_amount: u64, ring_global_index: u64, fee: u64, nonce_seed: u64) -> Transaction {
    let key_image = key_image_of(secret, pubkey);
    let mut tx = Transaction {
        version: 2,
        unlock_time: 0,
        inputs: vec![Input::Key {
            amount: input_amount,
            key_offsets: vec![ring_global_index],
            key_image,
        }],
        outputs: vec![Output {
            amount: input_amount.saturating_sub(fee),
            target: OutputTarget::Key { key: Hash([0x42; 32]) },
        }],
        extra: vec![],
        signatures: vec![],
    };
    let prefix_hash = {
        let mut unsigned = tx.clone();
        unsigned.signatures.clear();
        let bytes = cryptonote_serialization::binary::to_vec(&unsigned);
        Hash(*blake3::hash(&bytes).as_bytes())
    };
    tx.signatures = vec![sign_single_member_ring(&prefix_hash, secret, pubkey, nonce_seed)];
    tx
}

fn tx_hash(tx: &Transaction) -> Hash {
    let bytes = cryptonote_serialization::binary::to_vec(tx);
    Hash(*blake3::hash(&bytes).as_bytes())
}

#[test]
fn extend_computes_cumulative_difficulty() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), test_currency());
    let mut chain = ChainBuilder::new(test_currency());

    let genesis = chain.next_block(Hash::ZERO, 0, 900, &[]);
    let genesis_id = {
        let bytes = cryptonote_serialization::binary::to_vec(&genesis);
        Hash(*blake3::hash(&bytes).as_bytes())
    };
    let outcome = engine
        .add_new_block(genesis, Hash([1; 32]), 10_000, HashMap::new())
        .unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 0 });

    let block1 = chain.next_block(genesis_id, 1, 1_000, &[]);
    let block1_id = {
        let bytes = cryptonote_serialization::binary::to_vec(&block1);
        Hash(*blake3::hash(&bytes).as_bytes())
    };
    let outcome = engine
        .add_new_block(block1, Hash([2; 32]), 10_000, HashMap::new())
        .unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 1 });

    let block2 = chain.next_block(block1_id, 2, 1_120, &[]);
    let outcome = engine
        .add_new_block(block2, Hash([3; 32]), 10_000, HashMap::new())
        .unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 2 });

    assert_eq!(engine.top_height(), Some(2));

    let entries = engine.get_blocks(0, 3).unwrap();
    assert_eq!(entries.len(), 3);
    // Genesis (height 0) always mints at difficulty 1: cumulative == 1.
    assert_eq!(entries[0].cumulative_difficulty, 1);
    // Every block before the difficulty lag (15 blocks) also retargets to 1:
    // the second block overall carries cumulative difficulty 2.
    assert_eq!(entries[1].cumulative_difficulty, 2);
    assert_eq!(entries[2].cumulative_difficulty, 3);
}

#[test]
fn double_spend_in_pool_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), test_currency());
    let (secret, pubkey) = keypair(b"double-spend-test-key");
    let mut chain = ChainBuilder::new(test_currency()).with_miner_pubkey(pubkey);

    let genesis = chain.next_block(Hash::ZERO, 0, 900, &[]);
    let genesis_reward = genesis.miner_tx.outputs[0].amount;
    let genesis_bytes = cryptonote_serialization::binary::to_vec(&genesis);
    let genesis_id = Hash(*blake3::hash(&genesis_bytes).as_bytes());
    let outcome = engine
        .add_new_block(genesis, Hash([1; 32]), 10_000, HashMap::new())
        .unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 0 });

    // One more block so the genesis coinbase (unlock_time == 1, a
    // height-relative unlock) is actually spendable: the mempool's
    // unlock check runs against the current chain tip, not the block
    // the spend will eventually land in.
    let block1 = chain.next_block(genesis_id, 1, 1_020, &[]);
    let outcome = engine
        .add_new_block(block1, Hash([2; 32]), 10_000, HashMap::new())
        .unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 1 });

    // Two distinct, independently-signed transactions spending the same
    // one-time output (global index 0): each is individually well-formed
    // and carries a valid ring signature, but they share a key-image. The
    // first is admitted; the second must be rejected by the pool's
    // key-image index before a block ever sees it.
    let tx1 = spend_tx(&secret, &pubkey, genesis_reward, 0, 1_000_000_000, 1);
    let tx2 = spend_tx(&secret, &pubkey, genesis_reward, 0, 1_000_000_000, 2);
    let hash1 = tx_hash(&tx1);
    let hash2 = tx_hash(&tx2);
    assert_ne!(hash1, hash2);

    engine
        .submit_transaction(tx1, hash1, 10_001, false)
        .expect("first spend of the output is admitted");

    let second = engine.submit_transaction(tx2, hash2, 10_002, false);
    assert!(matches!(
        second,
        Err(cryptonote_blockchain::EngineError::Pool(cryptonote_txpool::PoolError::DoubleSpend))
    ));
}

#[test]
fn reorg_length_three_switches_chain_and_returns_txs() {
    let dir = tempfile::tempdir().unwrap();
    let currency = test_currency();
    let engine = open_engine(dir.path(), currency.clone());
    let (miner_secret, miner_pubkey) = keypair(b"reorg-test-miner");
    let mut chain = ChainBuilder::new(currency).with_miner_pubkey(miner_pubkey);

    // Main chain A0..A3 (heights 0..3), every coinbase owned by the same
    // keypair so one of them can be spent later.
    let mut prev = Hash::ZERO;
    let mut genesis_reward = 0u64;
    for height in 0u64..=3 {
        let block = chain.next_block(prev, height, 1_000 + height * 120, &[]);
        if height == 0 {
            genesis_reward = block.miner_tx.outputs[0].amount;
        }
        let id_bytes = cryptonote_serialization::binary::to_vec(&block);
        let id = Hash(*blake3::hash(&id_bytes).as_bytes());

        let outcome = engine.add_new_block(block, Hash([height as u8 + 1; 32]), 100_000, HashMap::new()).unwrap();
        assert_eq!(outcome, AddBlockOutcome::Added { height });

        prev = id;
    }
    let a3_id = prev;
    // Snapshot the ledger as of A3, before A4/A5 advance `chain` further, so
    // the competing branch below can start from the same common ancestor.
    let sizes_through_a3 = chain.sizes.clone();
    let coins_through_a3 = chain.already_generated_coins;

    // Build A4's spending transaction: spends genesis's coinbase output
    // (global index 0 of its amount bucket), already unlocked by height 4
    // given `mined_money_unlock_window == 1`.
    //
    // Comfortably above `FEE_PER_BYTE * blob_size` for a transaction this
    // small, well below the constant per-block reward.
    let fee = 1_000_000_000;
    let spend = spend_tx(&miner_secret, &miner_pubkey, genesis_reward, 0, fee, 42);
    let spend_hash = tx_hash(&spend);

    let mut supplied = HashMap::new();
    supplied.insert(spend_hash, spend.clone());

    let a4_block = chain.next_block(a3_id, 4, 1_000 + 4 * 120 + 1, &[(spend_hash, spend.clone(), fee)]);
    let a4_id = {
        let bytes = cryptonote_serialization::binary::to_vec(&a4_block);
        Hash(*blake3::hash(&bytes).as_bytes())
    };
    let outcome = engine.add_new_block(a4_block, Hash([90; 32]), 100_000, supplied.clone()).unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 4 });

    let a5_block = chain.next_block(a4_id, 5, 1_000 + 5 * 120 + 1, &[]);
    let outcome = engine.add_new_block(a5_block, Hash([91; 32]), 100_000, HashMap::new()).unwrap();
    assert_eq!(outcome, AddBlockOutcome::Added { height: 5 });

    // A competing branch B4..B7, also forking from A3, using an
    // independent size/emission ledger since it is a different chain of
    // blocks (same currency, same starting point at height 3).
    let mut alt_chain = ChainBuilder::new(test_currency()).with_miner_pubkey(miner_pubkey);
    alt_chain.sizes = sizes_through_a3;
    alt_chain.already_generated_coins = coins_through_a3;

    let mut alt_prev = a3_id;
    let mut switched = false;
    for (i, height) in (4u64..=7).enumerate() {
        let block = alt_chain.next_block(alt_prev, height, 2_000 + height * 120 + i as u64, &[]);
        let id_bytes = cryptonote_serialization::binary::to_vec(&block);
        let id = Hash(*blake3::hash(&id_bytes).as_bytes());

        let outcome = engine
            .add_new_block(block, Hash([100 + height as u8; 32]), 200_000, HashMap::new())
            .unwrap();
        if matches!(outcome, AddBlockOutcome::ChainSwitched { .. }) {
            switched = true;
        }
        alt_prev = id;
    }

    assert!(switched, "the heavier alt branch should have triggered a reorg");
    assert_eq!(engine.top_height(), Some(7));
    assert_eq!(engine.get_blocks(0, 8).unwrap()[3].id, a3_id);

    // A4's transaction was discarded along with the rest of the old
    // branch; it should have been offered back to the pool.
    let (template, _size, _fee) = engine.fill_block_template(512);
    assert!(template.contains(&spend_hash), "A4's transaction should be back in the pool");
}

#[test]
fn checkpoint_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut checkpoints = cryptonote_consensus_rules::Checkpoints::new();
    checkpoints.add(5, Hash([0xAA; 32])).unwrap();

    let currency = test_currency();
    let engine = Engine::open(
        dir.path(),
        currency.clone(),
        checkpoints,
        DifficultyConfig::with_target(120),
        Vec::new(),
        16,
    )
    .unwrap();
    let mut chain = ChainBuilder::new(currency);

    let mut prev = Hash::ZERO;
    for height in 0u64..5 {
        let block = chain.next_block(prev, height, 1_000 + height * 120, &[]);
        let bytes = cryptonote_serialization::binary::to_vec(&block);
        let id = Hash(*blake3::hash(&bytes).as_bytes());
        let outcome = engine.add_new_block(block, Hash([height as u8 + 1; 32]), 100_000, HashMap::new()).unwrap();
        assert_eq!(outcome, AddBlockOutcome::Added { height });
        prev = id;
    }

    // The candidate at height 5 is extremely unlikely to hash to exactly
    // `0xAA...AA`; any ordinarily-built block exercises the mismatch path.
    let block5 = chain.next_block(prev, 5, 1_000 + 5 * 120, &[]);
    let result = engine.add_new_block(block5, Hash([200; 32]), 100_000, HashMap::new());
    assert!(matches!(
        result,
        Err(cryptonote_blockchain::EngineError::CheckpointMismatch { height: 5 })
    ));
}

#[test]
fn coinbase_overflow_is_rejected_not_wrapped() {
    let dir = tempfile::tempdir().unwrap();
    let currency = CurrencyParameters::mainnet();
    let engine = open_engine(dir.path(), currency);

    let header = BlockHeader {
        major_version: 1,
        minor_version: 0,
        timestamp: 1_000,
        previous_block_hash: Hash::ZERO,
        nonce: 0,
    };
    let miner_tx = Transaction {
        version: 2,
        unlock_time: 60,
        inputs: vec![Input::Coinbase { height: 0 }],
        // u64::MAX + 2 overflows u64 arithmetic; `output_amount_sum` must
        // report this as unrepresentable rather than silently wrapping to a
        // small value that could then pass the reward check.
        outputs: vec![
            Output {
                amount: u64::MAX,
                target: OutputTarget::Key { key: Hash::ZERO },
            },
            Output {
                amount: 2,
                target: OutputTarget::Key { key: Hash::ZERO },
            },
        ],
        extra: vec![],
        signatures: vec![],
    };
    let block = Block {
        header,
        miner_tx,
        tx_hashes: vec![],
    };

    let result = engine.add_new_block(block, Hash([1; 32]), 10_000, HashMap::new());
    assert!(matches!(
        result,
        Err(cryptonote_blockchain::EngineError::WrongBlockReward { actual: u64::MAX, .. })
    ));
}

#[test]
fn random_outs_insufficient_then_sufficient() {
    let mut table = cryptonote_blockchain::output_table::OutputTable::new();
    let record = cryptonote_blockchain::output_table::OutputRecord {
        target: OutputTarget::Key { key: Hash::ZERO },
        unlock_time: 0,
        height: 0,
    };

    for _ in 0..8 {
        table.push(1_000_000, record.clone());
    }
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let err = cryptonote_blockchain::random_outs::get_random_outs_for_amounts(&table, &mut rng, 1_000_000, 10, 100, 100)
        .unwrap_err();
    assert_eq!(err.available, 8);
    assert_eq!(err.requested, 10);

    for _ in 0..12 {
        table.push(1_000_000, record.clone());
    }
    let outs = cryptonote_blockchain::random_outs::get_random_outs_for_amounts(&table, &mut rng, 1_000_000, 10, 100, 100)
        .unwrap();
    assert_eq!(outs.len(), 10);
    let mut unique = outs.clone();
    unique.dedup();
    assert_eq!(unique.len(), outs.len());
    for index in &outs {
        assert!(table.unlocked_indices(1_000_000, 100, 100).contains(index));
    }
}
