//! Difficulty retargeting: computing the next block's required difficulty
//! from a trimmed-mean of a sliding window of recent `(timestamp,
//! cumulative_difficulty)` samples.

use std::collections::VecDeque;

use crypto_bigint::{CheckedMul, U256};
use cryptonote_constants::difficulty::{DIFFICULTY_CUT, DIFFICULTY_LAG, DIFFICULTY_WINDOW};
use cryptonote_types::Hash;

/// Parameters governing the difficulty retarget window.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyConfig {
    /// Target seconds between blocks.
    pub target_seconds: u64,
    /// Number of samples the trimmed mean is computed over.
    pub window: u64,
    /// Number of most-recent samples excluded before the trim.
    pub lag: u64,
    /// Number of samples trimmed from each end of the sorted window.
    pub cut: u64,
}

impl DifficultyConfig {
    /// The reference network's default difficulty parameters at the given
    /// target block time.
    #[must_use]
    pub const fn with_target(target_seconds: u64) -> Self {
        Self {
            target_seconds,
            window: DIFFICULTY_WINDOW,
            lag: DIFFICULTY_LAG,
            cut: DIFFICULTY_CUT,
        }
    }

    /// Total number of timestamp/difficulty samples the cache needs on
    /// hand: `window + lag`.
    #[must_use]
    pub const fn required_samples(&self) -> u64 {
        self.window + self.lag
    }
}

/// A bounded window of recent `(timestamp, cumulative_difficulty)` samples,
/// used to compute the difficulty of the next block.
#[derive(Debug, Clone)]
pub struct DifficultyCache {
    config: DifficultyConfig,
    samples: VecDeque<(u64, u128)>,
}

impl DifficultyCache {
    /// Creates an empty cache for `config`.
    #[must_use]
    pub fn new(config: DifficultyConfig) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
        }
    }

    /// Rebuilds a cache from the most recent samples already known (e.g.
    /// read back from the block store at startup). `samples` must be in
    /// increasing height order; only the most recent `required_samples` are
    /// kept.
    #[must_use]
    pub fn from_samples(config: DifficultyConfig, samples: &[(u64, u128)]) -> Self {
        let mut cache = Self::new(config);
        let keep = config.required_samples() as usize;
        let start = samples.len().saturating_sub(keep);
        cache.samples.extend(&samples[start..]);
        cache
    }

    /// Appends a newly-applied block's `(timestamp, cumulative_difficulty)`
    /// and evicts the oldest sample beyond the configured window.
    pub fn push(&mut self, timestamp: u64, cumulative_difficulty: u128) {
        self.samples.push_back((timestamp, cumulative_difficulty));
        while self.samples.len() as u64 > self.config.required_samples() {
            self.samples.pop_front();
        }
    }

    /// Computes the difficulty the *next* block (i.e. the one built on top
    /// of the last pushed sample) must satisfy.
    #[must_use]
    pub fn next_difficulty(&self) -> u128 {
        let timestamps: Vec<u64> = self.samples.iter().map(|(t, _)| *t).collect();
        let cumulative: Vec<u128> = self.samples.iter().map(|(_, d)| *d).collect();
        next_difficulty(
            &timestamps,
            &cumulative,
            self.config.target_seconds,
            self.config.window,
            self.config.cut,
            self.config.lag,
        )
    }

    /// The median of the timestamps currently held, used for the
    /// "timestamp must exceed the median of the last N blocks" check.
    #[must_use]
    pub fn median_timestamp(&self, count: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let start = self.samples.len().saturating_sub(count);
        let mut timestamps: Vec<u64> = self.samples.iter().skip(start).map(|(t, _)| *t).collect();
        timestamps.sort_unstable();
        let mid = timestamps.len() / 2;
        Some(if timestamps.len() % 2 == 0 && mid > 0 {
            cryptonote_helper::num::get_mid(timestamps[mid - 1], timestamps[mid])
        } else {
            timestamps[mid]
        })
    }
}

/// Computes the difficulty target for the block that follows the window
/// described by `timestamps`/`cumulative_difficulties` (parallel arrays, one
/// entry per block, oldest first).
///
/// Drops the `lag` most recent samples, keeps at most `window` of what
/// remains, trims `cut` samples from each end of the *sorted-by-timestamp*
/// remainder, and returns a target difficulty from the trimmed-mean
/// work-over-time ratio. Never returns less than `1`.
#[must_use]
pub fn next_difficulty(
    timestamps: &[u64],
    cumulative_difficulties: &[u128],
    target_seconds: u64,
    window: u64,
    cut: u64,
    lag: u64,
) -> u128 {
    debug_assert_eq!(timestamps.len(), cumulative_difficulties.len());
    let len = timestamps.len();
    if len <= 1 {
        return 1;
    }

    let end = len.saturating_sub(lag as usize).max(1);
    let begin = end.saturating_sub(window as usize);
    let slice_len = end - begin;

    let mut sorted_timestamps: Vec<u64> = timestamps[begin..end].to_vec();
    sorted_timestamps.sort_unstable();

    let cut_each_side = (cut as usize).min(slice_len / 2);
    let trimmed = &sorted_timestamps[cut_each_side..slice_len - cut_each_side];

    if trimmed.len() < 2 {
        return 1;
    }

    let time_span = trimmed[trimmed.len() - 1].saturating_sub(trimmed[0]).max(1);

    // Same per-side offset as the timestamp trim, but applied positionally
    // (by height order, not by sorted-timestamp order) to the cumulative
    // difficulties, matching the reference retarget.
    let work_begin = begin + cut_each_side;
    let work_end = end - cut_each_side;
    let work = cumulative_difficulties[work_end - 1].saturating_sub(cumulative_difficulties[work_begin]);

    let time_span = u128::from(time_span);
    let target = u128::from(target_seconds);

    ((work * target + time_span - 1) / time_span).max(1)
}

/// Returns `true` if `hash`, interpreted as a little-endian 256-bit integer,
/// satisfies `difficulty` — i.e. `hash_value * difficulty` fits in 256 bits
/// without overflow. This is the proof-of-work accept condition; the hash
/// itself comes from whatever pluggable proof-of-work function the caller
/// configured (the core does not implement one, per the currency/consensus
/// parameters being a configuration input).
#[must_use]
pub fn hash_meets_difficulty(hash: &Hash, difficulty: u128) -> bool {
    if difficulty == 0 {
        return false;
    }
    let hash_value = U256::from_le_slice(&hash.0);
    let target = U256::from_u128(difficulty);
    bool::from(hash_value.checked_mul(&target).is_some())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_sample_returns_minimum_difficulty() {
        assert_eq!(next_difficulty(&[1000], &[0], 120, 720, 60, 15), 1);
    }

    #[test]
    fn zero_hash_meets_any_positive_difficulty() {
        assert!(hash_meets_difficulty(&Hash::ZERO, 1));
        assert!(hash_meets_difficulty(&Hash::ZERO, u128::MAX));
    }

    #[test]
    fn max_hash_fails_any_difficulty_above_one() {
        assert!(!hash_meets_difficulty(&Hash([0xff; 32]), 2));
    }

    #[test]
    fn zero_difficulty_is_never_met() {
        assert!(!hash_meets_difficulty(&Hash::ZERO, 0));
    }

    #[test]
    fn two_evenly_spaced_blocks_matches_target_over_span() {
        // Mirrors the "extend" seed scenario: genesis + two blocks with
        // timestamps 1000, 1120 and target 120 -> one full interval elapsed.
        let timestamps = [1000, 1120];
        let cumulative = [0u128, 1];
        let next = next_difficulty(&timestamps, &cumulative, 120, 720, 60, 15);
        assert_eq!(next, 1);
    }

    #[test]
    fn cache_evicts_beyond_window() {
        let config = DifficultyConfig {
            target_seconds: 120,
            window: 4,
            lag: 0,
            cut: 0,
        };
        let mut cache = DifficultyCache::new(config);
        for i in 0..10u64 {
            cache.push(1000 + i * 120, u128::from(i) + 1);
        }
        assert_eq!(cache.samples.len(), 4);
    }
}
