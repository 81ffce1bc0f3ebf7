//! The transaction validator's error taxonomy.
//!
//! One variant per check named in the validation pipeline, plus
//! `DoubleSpend` and `Lookup` for failures surfaced by the capability
//! traits in [`crate::context`].

/// Why a candidate transaction was rejected.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The transaction's format version is not one the validator accepts.
    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u64),
    /// A transaction had no inputs.
    #[error("transaction has no inputs")]
    EmptyInputs,
    /// A transaction had no outputs.
    #[error("transaction has no outputs")]
    EmptyOutputs,
    /// The `extra` field exceeded the configured size limit.
    #[error("extra field of {actual} bytes exceeds the {max} byte limit")]
    ExtraTooLarge {
        /// Size actually observed.
        actual: usize,
        /// Configured maximum.
        max: usize,
    },
    /// An output carried a zero amount outside the allowances for RingCT.
    #[error("output amount is zero")]
    ZeroOutputAmount,
    /// Summing output (or input) amounts overflowed `u64`.
    #[error("amount sum overflowed")]
    AmountOverflow,
    /// Total input amount was less than total output amount.
    #[error("negative fee: inputs {inputs} < outputs {outputs}")]
    NegativeFee {
        /// Sum of input amounts.
        inputs: u64,
        /// Sum of output amounts.
        outputs: u64,
    },
    /// The computed fee fell below the minimum required fee.
    #[error("fee {fee} below minimum {minimum}")]
    FeeTooLow {
        /// Fee actually paid.
        fee: u64,
        /// Minimum fee required.
        minimum: u64,
    },
    /// Two inputs of the same transaction shared a key-image.
    #[error("duplicate key-image within transaction")]
    DuplicateKeyImage,
    /// Two multisig inputs of the same transaction referenced the same
    /// output.
    #[error("duplicate multisig output reference within transaction")]
    DuplicateMultisigReference,
    /// A key input's relative output-index list resolved to an
    /// out-of-bounds absolute index.
    #[error("output index {index} out of range for amount {amount} (have {available})")]
    OutputIndexOutOfRange {
        /// The amount bucket being indexed into.
        amount: u64,
        /// The absolute index requested.
        index: u64,
        /// The number of outputs that actually exist for `amount`.
        available: u64,
    },
    /// A key input referenced an output that is not yet spendable.
    #[error("referenced output is still locked")]
    OutputNotYetUnlocked,
    /// A key input's ring signature did not verify.
    #[error("invalid ring signature")]
    InvalidRingSignature,
    /// A key input's key-image had already been spent.
    #[error("key-image already spent")]
    KeyImageAlreadySpent,
    /// A multisig input referenced an output that does not exist, or one
    /// that is not a multisig output.
    #[error("referenced multisig output not found")]
    MultisigOutputNotFound,
    /// A multisig input did not carry enough valid co-signer signatures.
    #[error("multisig input has {actual} valid signatures, needs {required}")]
    InsufficientMultisigSignatures {
        /// Signatures that verified.
        actual: usize,
        /// Signatures required by the output.
        required: u8,
    },
    /// The serialized transaction exceeded the maximum transaction size.
    #[error("transaction size {actual} exceeds maximum {max}")]
    TransactionTooLarge {
        /// Size actually observed.
        actual: u64,
        /// Configured maximum.
        max: u64,
    },
    /// A key-image already accounted for elsewhere (pool or chain) was
    /// reused — distinct from [`Self::KeyImageAlreadySpent`] in that this is
    /// raised by the caller (mempool/engine) composing the validator rather
    /// than the stateful input check itself.
    #[error("double spend detected")]
    DoubleSpend,
    /// A capability trait (output/key-image lookup) failed.
    #[error("lookup failed: {reason}")]
    Lookup {
        /// Human-readable cause, since lookups are backed by arbitrary
        /// storage implementations with their own error types.
        reason: String,
    },
}

/// Shorthand for `Result<T, ValidationError>`.
pub type Result<T> = core::result::Result<T, ValidationError>;
