//! Stateless semantic checks: everything decidable from the transaction
//! alone, without consulting chain state.

use std::collections::HashSet;

use cryptonote_types::{Input, Transaction};

use crate::error::{Result, ValidationError};

/// Checks the transaction's internal arithmetic and uniqueness invariants.
/// Does not check fees against a minimum — that is the size/fee gate's job,
/// since it needs the current block-fill policy.
pub fn check_semantics(tx: &Transaction) -> Result<u64> {
    for output in &tx.outputs {
        if output.amount == 0 {
            return Err(ValidationError::ZeroOutputAmount);
        }
    }

    let output_sum = tx.output_amount_sum().ok_or(ValidationError::AmountOverflow)?;
    let input_sum = tx.input_amount_sum().ok_or(ValidationError::AmountOverflow)?;

    if input_sum < output_sum {
        return Err(ValidationError::NegativeFee {
            inputs: input_sum,
            outputs: output_sum,
        });
    }

    let mut seen_key_images = HashSet::with_capacity(tx.inputs.len());
    let mut seen_multisig_refs = HashSet::new();
    for input in &tx.inputs {
        match input {
            Input::Key { key_image, .. } => {
                if !seen_key_images.insert(*key_image) {
                    return Err(ValidationError::DuplicateKeyImage);
                }
            }
            Input::Multisig {
                amount,
                output_index,
                ..
            } => {
                if !seen_multisig_refs.insert((*amount, *output_index)) {
                    return Err(ValidationError::DuplicateMultisigReference);
                }
            }
            Input::Coinbase { .. } => {}
        }
    }

    Ok(input_sum - output_sum)
}
