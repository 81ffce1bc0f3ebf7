//! Miner (coinbase) transaction prevalidation and reward checking — main
//! chain extend's checks 4 and 7.

use cryptonote_consensus_rules::CurrencyParameters;
use cryptonote_types::{Input, Transaction};

use crate::error::{EngineError, Result};

/// Structural checks on a candidate block's coinbase transaction: exactly
/// one coinbase input naming the height this block would occupy, at least
/// one output, and an unlock time that respects the mined-money window.
pub fn prevalidate_miner_transaction(
    tx: &Transaction,
    expected_height: u64,
    mined_money_unlock_window: u64,
) -> Result<()> {
    if tx.inputs.len() != 1 || !tx.signatures.is_empty() {
        return Err(EngineError::InvalidMinerTransaction(
            "miner transaction must have exactly one input and no signatures",
        ));
    }
    let Input::Coinbase { height } = tx.inputs[0] else {
        return Err(EngineError::InvalidMinerTransaction(
            "miner transaction's sole input must be a coinbase input",
        ));
    };
    if height != expected_height {
        return Err(EngineError::InvalidMinerTransaction(
            "coinbase height does not match the block it would occupy",
        ));
    }
    if tx.outputs.is_empty() {
        return Err(EngineError::InvalidMinerTransaction(
            "miner transaction must have at least one output",
        ));
    }

    let min_unlock = expected_height + mined_money_unlock_window;
    if tx.unlock_time < min_unlock {
        return Err(EngineError::InvalidMinerTransaction(
            "coinbase unlock time is below the mined-money unlock window",
        ));
    }

    Ok(())
}

/// Checks main chain extend's check 7: the coinbase output sum must equal
/// exactly the computed block reward (base reward, size-penalized, plus
/// fees) — never more, never less.
pub fn check_miner_tx_reward(
    tx: &Transaction,
    params: &CurrencyParameters,
    median_size: u64,
    current_size: u64,
    already_generated_coins: u64,
    total_fees: u64,
) -> Result<u64> {
    let Some(expected) =
        cryptonote_consensus_rules::block_reward(params, median_size, current_size, already_generated_coins, total_fees)
    else {
        return Err(EngineError::BlockTooLarge {
            actual: current_size,
            max: 2 * median_size,
        });
    };

    let Some(actual) = tx.output_amount_sum() else {
        return Err(EngineError::WrongBlockReward {
            actual: u64::MAX,
            expected,
        });
    };

    if actual != expected {
        return Err(EngineError::WrongBlockReward { actual, expected });
    }

    Ok(expected)
}
