//! `get_random_outs_for_amounts`: sampling decoy outputs for a wallet
//! building a ring signature.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::output_table::OutputTable;

/// Error returned when an amount does not have enough unlocked outputs to
/// satisfy a request.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("amount {amount} has {available} unlocked outputs, {requested} requested")]
pub struct InsufficientOutputs {
    /// The amount that was short.
    pub amount: u64,
    /// How many unlocked outputs exist for `amount`.
    pub available: u64,
    /// How many were requested.
    pub requested: u64,
}

/// Samples `count` distinct, currently-unlocked global indexes for `amount`,
/// uniformly, without replacement.
///
/// Uses a shuffled-prefix generator (Fisher-Yates over the eligible index
/// list, truncated to `count`) rather than rejection sampling, so the cost
/// is linear in the number of eligible outputs regardless of how close
/// `count` is to the total.
pub fn get_random_outs_for_amounts<R: Rng + ?Sized>(
    table: &OutputTable,
    rng: &mut R,
    amount: u64,
    count: usize,
    height: u64,
    timestamp: u64,
) -> Result<Vec<u64>, InsufficientOutputs> {
    let mut eligible = table.unlocked_indices(amount, height, timestamp);
    if eligible.len() < count {
        return Err(InsufficientOutputs {
            amount,
            available: eligible.len() as u64,
            requested: count as u64,
        });
    }

    eligible.shuffle(rng);
    eligible.truncate(count);
    eligible.sort_unstable();
    Ok(eligible)
}
