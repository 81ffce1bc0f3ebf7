//! Stateful input validation: resolving ring members against the engine's
//! output index, checking unlock times, verifying signatures, and rejecting
//! already-spent key-images.

use cryptonote_types::{Input, OutputTarget, Transaction};

use crate::{
    context::{KeyImageSpent, OutputLookup, ResolvedOutput},
    error::{Result, ValidationError},
    signatures::{verify_multisig_signature, verify_ring_signature},
};

/// Result of validating every input of a transaction: the highest block
/// height any resolved output depends on, used to invalidate mempool
/// entries after a reorganization rolls that height away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputValidationOutcome {
    /// Highest `ResolvedOutput::height` observed while resolving this
    /// transaction's inputs.
    pub max_used_block_height: u64,
}

/// Validates every input of `tx` against `outputs`/`key_images`, given the
/// transaction's signature-prefix hash.
pub fn check_inputs<O, K>(
    tx: &Transaction,
    prefix_hash: &cryptonote_types::Hash,
    outputs: &O,
    key_images: &K,
) -> Result<InputValidationOutcome>
where
    O: OutputLookup,
    K: KeyImageSpent,
{
    let mut outcome = InputValidationOutcome::default();

    if !tx.is_coinbase() && tx.signatures.len() != tx.inputs.len() {
        return Err(ValidationError::InvalidRingSignature);
    }

    for (input, sig) in tx.inputs.iter().zip(tx.signatures.iter()) {
        match input {
            Input::Coinbase { .. } => {}
            Input::Key {
                amount,
                key_offsets,
                key_image,
            } => {
                if key_images.is_spent(key_image)? {
                    return Err(ValidationError::KeyImageAlreadySpent);
                }

                let available = outputs.output_count(*amount)?;
                let mut ring_keys = Vec::with_capacity(key_offsets.len());
                let (height, timestamp) = outputs.unlock_reference()?;

                for &index in key_offsets {
                    if index >= available {
                        return Err(ValidationError::OutputIndexOutOfRange {
                            amount: *amount,
                            index,
                            available,
                        });
                    }
                    let resolved = resolve_and_check_unlocked(outputs, *amount, index, height, timestamp)?;
                    match resolved.target {
                        OutputTarget::Key { key } => ring_keys.push(key),
                        OutputTarget::Multisig { .. } => {
                            return Err(ValidationError::OutputIndexOutOfRange {
                                amount: *amount,
                                index,
                                available,
                            })
                        }
                    }
                    outcome.max_used_block_height = outcome.max_used_block_height.max(resolved.height);
                }

                if !verify_ring_signature(prefix_hash, key_image, &ring_keys, sig) {
                    return Err(ValidationError::InvalidRingSignature);
                }
            }
            Input::Multisig {
                amount,
                output_index,
                ..
            } => {
                let Some(resolved) = outputs.resolve(*amount, *output_index)? else {
                    return Err(ValidationError::MultisigOutputNotFound);
                };
                let OutputTarget::Multisig {
                    required_signatures,
                    keys,
                } = resolved.target
                else {
                    return Err(ValidationError::MultisigOutputNotFound);
                };

                if !verify_multisig_signature(prefix_hash, &keys, required_signatures, sig) {
                    return Err(ValidationError::InsufficientMultisigSignatures {
                        actual: sig.members.len(),
                        required: required_signatures,
                    });
                }
                outcome.max_used_block_height = outcome.max_used_block_height.max(resolved.height);
            }
        }
    }

    Ok(outcome)
}

fn resolve_and_check_unlocked<O: OutputLookup>(
    outputs: &O,
    amount: u64,
    index: u64,
    height: u64,
    timestamp: u64,
) -> Result<ResolvedOutput> {
    let Some(resolved) = outputs.resolve(amount, index)? else {
        return Err(ValidationError::OutputIndexOutOfRange {
            amount,
            index,
            available: index,
        });
    };
    if !cryptonote_consensus_rules::is_unlocked(resolved.unlock_time, height, timestamp) {
        return Err(ValidationError::OutputNotYetUnlocked);
    }
    Ok(resolved)
}
