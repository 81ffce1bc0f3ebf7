//! Serialization codecs for persistence and wire.
//!
//! Two codecs co-exist, matching the two consumers named in the on-disk and
//! wire format description: [`binary`] (struct-order, varint lengths, fixed
//! endianness — used for on-disk block entries and the mempool snapshot) and
//! [`keyvalue`] (tagged, self-describing — used for RPC envelopes).

pub mod binary;
pub mod error;
pub mod keyvalue;
pub mod varint;

pub use binary::{Decode, Encode};
pub use error::{Error, Result};
