//! The global output index: `(amount, global_index) -> output`, the table
//! `cryptonote_consensus::OutputLookup` resolves ring members and multisig
//! references against.

use std::collections::HashMap;

use bytes::{Buf, BufMut};
use cryptonote_consensus::{OutputLookup, ResolvedOutput};
use cryptonote_serialization::binary::{Decode, Encode};
use cryptonote_serialization::varint::{read_varint, write_varint};
use cryptonote_types::OutputTarget;

/// A single entry of the output table: everything a future spend of this
/// output needs to check its unlock condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// The output's spending condition.
    pub target: OutputTarget,
    /// The parent transaction's `unlock_time`.
    pub unlock_time: u64,
    /// Height of the block the parent transaction was included in.
    pub height: u64,
}

impl Encode for OutputRecord {
    fn encode<B: BufMut>(&self, w: &mut B) {
        self.target.encode(w);
        write_varint(self.unlock_time, w);
        write_varint(self.height, w);
    }
}

impl Decode for OutputRecord {
    fn decode<B: Buf>(r: &mut B) -> cryptonote_serialization::Result<Self> {
        Ok(Self {
            target: OutputTarget::decode(r)?,
            unlock_time: read_varint(r)?,
            height: read_varint(r)?,
        })
    }
}

/// `amount -> ordered outputs ever created for that amount`, global index is
/// the position within the bucket. Amount `0` is the RingCT-style bucket
/// used once a network no longer carries plaintext amounts; this engine
/// makes no such distinction itself.
#[derive(Debug, Default, Clone)]
pub struct OutputTable {
    buckets: HashMap<u64, Vec<OutputRecord>>,
    /// `(height, timestamp)` the next [`OutputLookup::unlock_reference`] call
    /// reports — set by the engine to the block currently being validated
    /// before it runs the validator against that block's transactions.
    reference: (u64, u64),
}

impl OutputTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `(height, timestamp)` pair [`OutputLookup::unlock_reference`]
    /// reports, ahead of validating a block at that height.
    pub fn set_reference(&mut self, height: u64, timestamp: u64) {
        self.reference = (height, timestamp);
    }

    /// Appends a newly-created output, returning its freshly-assigned
    /// global index within `amount`'s bucket.
    pub fn push(&mut self, amount: u64, record: OutputRecord) -> u64 {
        let bucket = self.buckets.entry(amount).or_default();
        bucket.push(record);
        (bucket.len() - 1) as u64
    }

    /// Removes the most recently pushed output of `amount`, for reorg
    /// rollback. Panics if the bucket is empty, since a well-formed reorg
    /// never pops more outputs than it pushed.
    pub fn pop(&mut self, amount: u64) {
        if let Some(bucket) = self.buckets.get_mut(&amount) {
            bucket.pop();
        }
    }

    /// Every currently-unlocked global index for `amount`, given the
    /// reference `(height, timestamp)` the unlock check is evaluated
    /// against.
    #[must_use]
    pub fn unlocked_indices(&self, amount: u64, height: u64, timestamp: u64) -> Vec<u64> {
        let Some(bucket) = self.buckets.get(&amount) else {
            return Vec::new();
        };
        bucket
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                cryptonote_consensus_rules::is_unlocked(record.unlock_time, height, timestamp)
            })
            .map(|(index, _)| index as u64)
            .collect()
    }
}

impl OutputLookup for OutputTable {
    fn resolve(
        &self,
        amount: u64,
        global_index: u64,
    ) -> cryptonote_consensus::Result<Option<ResolvedOutput>> {
        Ok(self
            .buckets
            .get(&amount)
            .and_then(|bucket| bucket.get(global_index as usize))
            .map(|record| ResolvedOutput {
                target: record.target.clone(),
                unlock_time: record.unlock_time,
                height: record.height,
            }))
    }

    fn output_count(&self, amount: u64) -> cryptonote_consensus::Result<u64> {
        Ok(self.buckets.get(&amount).map_or(0, |b| b.len() as u64))
    }

    fn unlock_reference(&self) -> cryptonote_consensus::Result<(u64, u64)> {
        Ok(self.reference)
    }
}
