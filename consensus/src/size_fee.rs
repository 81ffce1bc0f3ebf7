//! The size/fee gate: the last pipeline stage, checked against the
//! transaction's already-known serialized size and computed fee.

use crate::{
    context::TxSizeLimit,
    error::{Result, ValidationError},
};

/// Checks `blob_size` against the configured maximum and `fee` against the
/// currently required per-byte rate, rejecting fee-less transactions that
/// are not exempted (coinbase transactions never reach this gate; pool
/// replay with `keep_by_block` bypasses it at the call site).
pub fn check_size_and_fee<L: TxSizeLimit>(limits: &L, blob_size: u64, fee: u64) -> Result<()> {
    let max = limits.max_tx_size();
    if blob_size > max {
        return Err(ValidationError::TransactionTooLarge { actual: blob_size, max });
    }

    let minimum = limits.required_fee_per_byte().saturating_mul(blob_size);
    if fee < minimum {
        return Err(ValidationError::FeeTooLow { fee, minimum });
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    struct Fixed {
        max_size: u64,
        fee_per_byte: u64,
    }

    impl TxSizeLimit for Fixed {
        fn max_tx_size(&self) -> u64 {
            self.max_size
        }
        fn required_fee_per_byte(&self) -> u64 {
            self.fee_per_byte
        }
    }

    #[test]
    fn rejects_oversized_blobs() {
        let limits = Fixed {
            max_size: 100,
            fee_per_byte: 1,
        };
        assert!(matches!(
            check_size_and_fee(&limits, 101, 1_000_000),
            Err(ValidationError::TransactionTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_underpaid_fees() {
        let limits = Fixed {
            max_size: 100,
            fee_per_byte: 10,
        };
        assert!(matches!(
            check_size_and_fee(&limits, 50, 100),
            Err(ValidationError::FeeTooLow { .. })
        ));
    }

    #[test]
    fn accepts_sufficient_fee() {
        let limits = Fixed {
            max_size: 100,
            fee_per_byte: 10,
        };
        assert!(check_size_and_fee(&limits, 50, 500).is_ok());
    }
}
