//! Core domain types: hashes, blocks and transactions.
//!
//! These types carry no validation or storage logic; they are plain data,
//! shared by the serialization, storage, consensus and blockchain crates.

pub mod block;
pub mod hash;
pub mod transaction;

pub use block::{Block, BlockEntry, BlockHeader};
pub use hash::Hash;
pub use transaction::{ExtraField, Input, Output, OutputTarget, RingSignature, Transaction};
