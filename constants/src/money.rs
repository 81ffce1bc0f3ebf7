//! Emission and fee constants.

use crate::block;

/// Total number of atomic units ever to be generated.
pub const MONEY_SUPPLY: u64 = u64::MAX - 1;

/// Controls how quickly the block reward decays as `MONEY_SUPPLY` is approached;
/// emission halves roughly every `2^EMISSION_SPEED_FACTOR_PER_MINUTE` minutes of
/// block time once accounted in the base-reward formula.
pub const EMISSION_SPEED_FACTOR_PER_MINUTE: u64 = 20;

/// The reward floor paid out once the bulk of `MONEY_SUPPLY` has been emitted.
pub const FINAL_SUBSIDY_PER_MINUTE: u64 = 300_000_000_000; // 3 * 10^11

/// Number of decimal places in the display denomination.
pub const DISPLAY_DECIMAL_POINT: u64 = 12;

/// Number of atomic units in one display coin.
pub const COIN: u64 = 1_000_000_000_000; // 10^12

/// Legacy flat per-kB fee, kept for historical block validation.
pub const FEE_PER_KB_OLD: u64 = 10_000_000_000; // 10^10

/// Flat per-kB fee used before dynamic per-byte fees were introduced.
pub const FEE_PER_KB: u64 = 2_000_000_000; // 2 * 10^9

/// Per-byte fee floor under the dynamic fee scheme.
pub const FEE_PER_BYTE: u64 = 300_000;

/// Base fee (per kB) used by the dynamic-fee reference calculation.
pub const DYNAMIC_FEE_PER_KB_BASE_FEE: u64 = 2_000_000_000;

/// Reference block reward used to scale the dynamic fee.
pub const DYNAMIC_FEE_PER_KB_BASE_BLOCK_REWARD: u64 = 10_000_000_000_000;

/// Dynamic-fee base fee after the V5 reward-zone resize.
pub const DYNAMIC_FEE_PER_KB_BASE_FEE_V5: u64 = 2_000_000_000
    * block::BLOCK_GRANTED_FULL_REWARD_ZONE_V2
    / block::BLOCK_GRANTED_FULL_REWARD_ZONE_V5;

/// Reference transaction weight the dynamic fee scheme is calibrated against.
pub const DYNAMIC_FEE_REFERENCE_TRANSACTION_WEIGHT: u64 = 3_000;
