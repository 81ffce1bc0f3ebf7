//! Emission, block-size-limit, reward and unlock-time rules.
//!
//! Per the "global mutable state" design note, every rule here takes an
//! explicit [`CurrencyParameters`] value rather than reaching for a
//! process-wide singleton; `testnet` is a constructor argument on that
//! value, not a separate global flag threaded everywhere.

use cryptonote_constants::{block, money};

/// The height/timestamp switchover point for `unlock_time` interpretation:
/// below this value `unlock_time` is a block height, at or above it, a UNIX
/// timestamp.
pub const UNLOCK_TIME_HEIGHT_SWITCH: u64 = 500_000_000;

/// Explicit, caller-constructed consensus parameters — genesis timestamp,
/// fork schedule knobs, and size/emission constants the core does not alter
/// (spec'd as configuration inputs, not discovered facts).
#[derive(Debug, Clone)]
pub struct CurrencyParameters {
    /// `true` for the test network, which relaxes nothing here but is kept
    /// so downstream crates (e.g. address encoding) can branch on it.
    pub testnet: bool,
    /// Total atomic units ever to be minted.
    pub money_supply: u64,
    /// Right-shift applied to the remaining supply each block; controls how
    /// quickly the reward decays.
    pub emission_speed_factor: u64,
    /// Reward floor once the decaying reward would fall below it.
    pub final_subsidy_per_minute: u64,
    /// Initial soft cap on a block's cumulative size, before growth.
    pub initial_max_block_cumulative_size: u64,
    /// Numerator of the per-block size-cap growth rate.
    pub size_growth_numerator: u64,
    /// Denominator of the per-block size-cap growth rate.
    pub size_growth_denominator: u64,
    /// Number of blocks a coinbase output stays locked.
    pub mined_money_unlock_window: u64,
}

impl CurrencyParameters {
    /// The reference mainnet parameters.
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            testnet: false,
            money_supply: money::MONEY_SUPPLY,
            emission_speed_factor: money::EMISSION_SPEED_FACTOR_PER_MINUTE,
            final_subsidy_per_minute: money::FINAL_SUBSIDY_PER_MINUTE,
            initial_max_block_cumulative_size: block::BLOCK_GRANTED_FULL_REWARD_ZONE_V1 * 10,
            size_growth_numerator: 100 * 1024,
            size_growth_denominator: 365 * 24 * 60 * 60 / 120, // ~100KB/year at a 2-minute target
            mined_money_unlock_window: 60,
        }
    }

    /// The reference parameters with `testnet` set.
    #[must_use]
    pub const fn testnet() -> Self {
        Self {
            testnet: true,
            ..Self::mainnet()
        }
    }
}

/// The un-penalized base reward for a block whose `already_generated_coins`
/// (not including this block) is `already_generated_coins`.
#[must_use]
pub fn base_reward(params: &CurrencyParameters, already_generated_coins: u64) -> u64 {
    let remaining = params.money_supply.saturating_sub(already_generated_coins);
    let decayed = remaining >> params.emission_speed_factor;
    decayed.max(params.final_subsidy_per_minute)
}

/// Applies the block-size penalty to `reward` for a block of `current_size`
/// against a `median_size` reference. Returns `None` if `current_size` is
/// more than double the median — such a block must be rejected outright,
/// not merely penalized to zero.
#[must_use]
pub fn penalize_reward(reward: u64, median_size: u64, current_size: u64) -> Option<u64> {
    if median_size == 0 || current_size <= median_size {
        return Some(reward);
    }
    if current_size > 2 * median_size {
        return None;
    }

    let remaining_headroom = 2 * median_size - current_size;
    let numerator = u128::from(reward) * u128::from(remaining_headroom) * u128::from(current_size);
    let denominator = u128::from(median_size) * u128::from(median_size);

    u64::try_from(numerator / denominator).ok()
}

/// The full coinbase reward a block at `current_size` is entitled to mint,
/// given the `median_size` of recent blocks, the coins already generated
/// before it, and the total fees its transactions pay. Returns `None` if the
/// block is oversized outright.
#[must_use]
pub fn block_reward(
    params: &CurrencyParameters,
    median_size: u64,
    current_size: u64,
    already_generated_coins: u64,
    total_fees: u64,
) -> Option<u64> {
    let base = base_reward(params, already_generated_coins);
    let penalized = penalize_reward(base, median_size, current_size)?;
    Some(penalized.saturating_add(total_fees))
}

/// The soft cap on a block's cumulative size (header + coinbase + every
/// included transaction, serialized) at `height`.
#[must_use]
pub fn max_block_cumulative_size(params: &CurrencyParameters, height: u64) -> u64 {
    let growth = height.saturating_mul(params.size_growth_numerator) / params.size_growth_denominator.max(1);
    params.initial_max_block_cumulative_size.saturating_add(growth)
}

/// Returns `true` if an output with the given `unlock_time`, included in a
/// transaction, is spendable at chain height `height` and wall-clock time
/// `timestamp`.
#[must_use]
pub fn is_unlocked(unlock_time: u64, height: u64, timestamp: u64) -> bool {
    if unlock_time < UNLOCK_TIME_HEIGHT_SWITCH {
        unlock_time <= height
    } else {
        unlock_time <= timestamp
    }
}
