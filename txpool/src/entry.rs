//! A single pooled transaction and its bookkeeping.

use bytes::{Buf, BufMut};
use cryptonote_serialization::binary::{Decode, Encode};
use cryptonote_serialization::varint::{read_varint, write_varint};
use cryptonote_types::{Hash, Transaction};

/// A transaction held in the pool, plus the metadata admission and reorg
/// replay need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    /// The pooled transaction.
    pub tx: Transaction,
    /// Its hash, cached so the pool never has to re-hash on lookup.
    pub tx_hash: Hash,
    /// Encoded size in bytes.
    pub blob_size: u64,
    /// `input_amount_sum - output_amount_sum`.
    pub fee: u64,
    /// UNIX timestamp the pool first saw this transaction.
    pub receive_time: u64,
    /// Highest block height any of its inputs were resolved against.
    pub max_used_height: u64,
    /// Set when this entry was reinserted during reorg replay (the chain
    /// that originally held it was discarded) rather than freshly received.
    pub keep_by_block: bool,
    /// Height of the most recent block this transaction failed
    /// re-validation against, if any; avoids re-attempting doomed
    /// transactions on every subsequent template fill.
    pub last_failed_block: Option<Hash>,
}

impl PoolEntry {
    /// Fee per byte, used to rank transactions for block-template fill.
    /// Zero-size entries (never constructed in practice) rank last rather
    /// than dividing by zero.
    #[must_use]
    pub fn fee_per_byte(&self) -> u64 {
        if self.blob_size == 0 {
            0
        } else {
            self.fee / self.blob_size
        }
    }
}

impl Encode for PoolEntry {
    fn encode<B: BufMut>(&self, w: &mut B) {
        self.tx.encode(w);
        self.tx_hash.encode(w);
        write_varint(self.blob_size, w);
        write_varint(self.fee, w);
        write_varint(self.receive_time, w);
        write_varint(self.max_used_height, w);
        w.put_u8(u8::from(self.keep_by_block));
        match &self.last_failed_block {
            None => w.put_u8(0),
            Some(hash) => {
                w.put_u8(1);
                hash.encode(w);
            }
        }
    }
}

impl Decode for PoolEntry {
    fn decode<B: Buf>(r: &mut B) -> cryptonote_serialization::Result<Self> {
        let tx = Transaction::decode(r)?;
        let tx_hash = Hash::decode(r)?;
        let blob_size = read_varint(r)?;
        let fee = read_varint(r)?;
        let receive_time = read_varint(r)?;
        let max_used_height = read_varint(r)?;
        if r.remaining() < 1 {
            return Err(cryptonote_serialization::Error::UnexpectedEof);
        }
        let keep_by_block = r.get_u8() != 0;
        if r.remaining() < 1 {
            return Err(cryptonote_serialization::Error::UnexpectedEof);
        }
        let last_failed_block = if r.get_u8() == 0 {
            None
        } else {
            Some(Hash::decode(r)?)
        };
        Ok(Self {
            tx,
            tx_hash,
            blob_size,
            fee,
            receive_time,
            max_used_height,
            keep_by_block,
            last_failed_block,
        })
    }
}
