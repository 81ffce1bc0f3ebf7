//! The blockchain engine: block store, block and secondary indexes,
//! checkpoints, difficulty and currency parameters, the output table,
//! alt-chain tracking, the mempool, and the `add_new_block` state machine
//! that ties them together behind a single lock.

pub mod alt_chain;
pub mod block_index;
pub mod engine;
pub mod error;
pub mod events;
pub mod miner_tx;
pub mod output_table;
pub mod random_outs;
pub mod secondary_indexes;

pub use engine::{AddBlockOutcome, Engine};
pub use error::{EngineError, Result};
pub use events::BlockchainEvent;
