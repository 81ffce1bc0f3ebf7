//! Constant and default consensus parameters used throughout the node.
//!
//! These are the *default* CryptoNote-style currency parameters; a running
//! node may override them via [`cryptonote_rules::CurrencyParameters`]
//! (constructed at startup, analogous to the reference client's currency
//! builder), but the values here match the reference network.
#![deny(missing_docs)]

pub mod block;
pub mod difficulty;
pub mod money;
pub mod tx;
