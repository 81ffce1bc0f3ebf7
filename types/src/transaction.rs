//! Transaction, input, output and `extra` field types.
//!
//! The reference implementation represents `Input`, `OutputTarget` and
//! `ExtraField` via a deep `boost::variant`/virtual-dispatch hierarchy.
//! Here they are plain tagged sum types, matched on rather than
//! dispatched through a vtable.

use crate::hash::Hash;

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Input {
    /// The single reward-issuing input of a coinbase (miner) transaction.
    Coinbase {
        /// The height of the block this coinbase transaction belongs to.
        height: u64,
    },
    /// A input spending one of the signer's one-time outputs, referencing
    /// `mixin` decoy outputs of the same amount to hide which is real.
    Key {
        /// Amount being spent (`0` for RingCT-only amounts commitments).
        amount: u64,
        /// Global output indexes of the ring, in ascending order. Stored
        /// here as absolute values for ease of use; the wire codec
        /// delta-encodes them (first entry absolute, rest relative to the
        /// previous) (see `cryptonote-serialization`).
        key_offsets: Vec<u64>,
        /// The key-image: the double-spend-prevention tag for this input.
        key_image: Hash,
    },
    /// A multisig input, spending a [`OutputTarget::Multisig`] output.
    Multisig {
        /// Amount being spent.
        amount: u64,
        /// Global output index of the referenced multisig output.
        output_index: u64,
        /// The signer's spend public key, used to locate the co-signer set.
        signer_key: Hash,
    },
}

impl Input {
    /// Returns `true` if this is the coinbase input of a miner transaction.
    #[must_use]
    pub const fn is_coinbase(&self) -> bool {
        matches!(self, Self::Coinbase { .. })
    }

    /// Returns the key-image of a [`Input::Key`] input, if this is one.
    #[must_use]
    pub const fn key_image(&self) -> Option<&Hash> {
        match self {
            Self::Key { key_image, .. } => Some(key_image),
            _ => None,
        }
    }

    /// The amount this input claims to spend.
    #[must_use]
    pub const fn amount(&self) -> u64 {
        match self {
            Self::Coinbase { .. } => 0,
            Self::Key { amount, .. } | Self::Multisig { amount, .. } => *amount,
        }
    }
}

/// The spending condition of a transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputTarget {
    /// A standard one-time-key output, spendable by whoever can produce a
    /// valid ring signature / key-image for `key`.
    Key {
        /// The one-time output public key.
        key: Hash,
    },
    /// An `m`-of-`n` multisig output.
    Multisig {
        /// Number of signatures required to spend this output.
        required_signatures: u8,
        /// Public keys of all co-signers.
        keys: Vec<Hash>,
    },
}

/// A single transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Output {
    /// Amount carried by this output (`0` under RingCT, where the real
    /// amount is hidden in a Pedersen commitment out of scope here).
    pub amount: u64,
    /// The spending condition.
    pub target: OutputTarget,
}

/// A single TLV-ish entry of a transaction's `extra` field.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtraField {
    /// Padding bytes with no semantic meaning, used to pad `extra` to a
    /// minimum/maximum size.
    Padding(u8),
    /// The transaction's one-time public key, used by the recipient to
    /// derive their output's one-time key.
    PublicKey(Hash),
    /// An arbitrary nonce; in practice either an 8-byte encrypted payment id
    /// or a 33-byte plaintext one.
    Nonce(Vec<u8>),
}

/// A full transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    /// Transaction format version.
    pub version: u64,
    /// The height (`< HEIGHT_SWITCH`) or UNIX timestamp (`>= HEIGHT_SWITCH`)
    /// at or after which every output of this transaction becomes
    /// spendable.
    pub unlock_time: u64,
    /// Ordered list of inputs.
    pub inputs: Vec<Input>,
    /// Ordered list of outputs.
    pub outputs: Vec<Output>,
    /// Opaque `extra` byte-string, parsed lazily into [`ExtraField`]s.
    pub extra: Vec<u8>,
    /// Per-input signatures; empty for coinbase transactions.
    pub signatures: Vec<RingSignature>,
}

/// A ring signature over a single input: one `(c, r)` pair per ring member.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RingSignature {
    /// Per-member `(c, r)` scalar pairs, each 32 bytes.
    pub members: Vec<(Hash, Hash)>,
}

impl Transaction {
    /// Returns `true` if this is a coinbase (miner) transaction: exactly one
    /// coinbase input and no signatures.
    #[must_use]
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase() && self.signatures.is_empty()
    }

    /// Sum of all output amounts, using checked arithmetic so an overflowing
    /// coinbase (e.g. `MONEY_SUPPLY + 1`) is reported rather than silently
    /// wrapped.
    pub fn output_amount_sum(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.amount))
    }

    /// Sum of all (non-coinbase) input amounts.
    pub fn input_amount_sum(&self) -> Option<u64> {
        self.inputs
            .iter()
            .try_fold(0u64, |acc, input| acc.checked_add(input.amount()))
    }

    /// Extracts every transaction-local key-image, in input order.
    pub fn key_images(&self) -> impl Iterator<Item = &Hash> {
        self.inputs.iter().filter_map(Input::key_image)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coinbase_detection() {
        let tx = Transaction {
            version: 2,
            unlock_time: 100,
            inputs: vec![Input::Coinbase { height: 10 }],
            outputs: vec![],
            extra: vec![],
            signatures: vec![],
        };
        assert!(tx.is_coinbase());
    }

    #[test]
    fn output_sum_overflow_is_detected() {
        let tx = Transaction {
            version: 2,
            unlock_time: 0,
            inputs: vec![Input::Coinbase { height: 0 }],
            outputs: vec![
                Output {
                    amount: u64::MAX,
                    target: OutputTarget::Key { key: Hash::ZERO },
                },
                Output {
                    amount: 1,
                    target: OutputTarget::Key { key: Hash::ZERO },
                },
            ],
            extra: vec![],
            signatures: vec![],
        };
        assert_eq!(tx.output_amount_sum(), None);
    }
}
