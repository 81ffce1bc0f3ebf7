//! Syntax checks: the first pass over a just-decoded transaction, verifying
//! it is even shaped like something that could be valid before spending any
//! time on semantics or stateful lookups.

use cryptonote_constants::tx::{CURRENT_TRANSACTION_VERSION, MAX_TX_EXTRA_SIZE};
use cryptonote_types::Transaction;

use crate::error::{Result, ValidationError};

/// Checks the transaction is well-formed independent of any other
/// transaction or chain state.
pub fn check_syntax(tx: &Transaction) -> Result<()> {
    if tx.version == 0 || tx.version > CURRENT_TRANSACTION_VERSION {
        return Err(ValidationError::UnsupportedVersion(tx.version));
    }
    if tx.inputs.is_empty() {
        return Err(ValidationError::EmptyInputs);
    }
    if tx.outputs.is_empty() {
        return Err(ValidationError::EmptyOutputs);
    }
    if tx.extra.len() as u64 > MAX_TX_EXTRA_SIZE {
        return Err(ValidationError::ExtraTooLarge {
            actual: tx.extra.len(),
            max: MAX_TX_EXTRA_SIZE as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use cryptonote_types::{Hash, Input, Output, OutputTarget};

    use super::*;

    fn base_tx() -> Transaction {
        Transaction {
            version: 2,
            unlock_time: 0,
            inputs: vec![Input::Key {
                amount: 0,
                key_offsets: vec![1, 2],
                key_image: Hash::ZERO,
            }],
            outputs: vec![Output {
                amount: 10,
                target: OutputTarget::Key { key: Hash::ZERO },
            }],
            extra: vec![],
            signatures: vec![],
        }
    }

    #[test]
    fn accepts_a_well_formed_tx() {
        assert!(check_syntax(&base_tx()).is_ok());
    }

    #[test]
    fn rejects_empty_inputs() {
        let mut tx = base_tx();
        tx.inputs.clear();
        assert_eq!(check_syntax(&tx), Err(ValidationError::EmptyInputs));
    }

    #[test]
    fn rejects_oversized_extra() {
        let mut tx = base_tx();
        tx.extra = vec![0u8; MAX_TX_EXTRA_SIZE as usize + 1];
        assert!(matches!(
            check_syntax(&tx),
            Err(ValidationError::ExtraTooLarge { .. })
        ));
    }
}
