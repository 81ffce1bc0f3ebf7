//! Immutable (height, hash) checkpoints gating reorganization depth.

use std::collections::BTreeMap;

use cryptonote_types::Hash;

/// An error returned when adding a checkpoint that conflicts with an
/// existing one at the same height.
#[derive(Debug, thiserror::Error)]
#[error("checkpoint at height {height} already set to a different hash")]
pub struct CheckpointConflict {
    /// The height of the conflicting checkpoint.
    pub height: u64,
}

/// An ordered set of trusted `(height, hash)` pairs. A chain may not be
/// reorganized across a checkpoint: once a block at a checkpointed height is
/// on the main chain, it — and everything at or below it — is permanent.
#[derive(Debug, Default, Clone)]
pub struct Checkpoints {
    points: BTreeMap<u64, Hash>,
}

impl Checkpoints {
    /// An empty checkpoint set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: BTreeMap::new(),
        }
    }

    /// Adds a checkpoint. Adding the same `(height, hash)` twice is a no-op;
    /// adding a different hash at an already-checkpointed height is
    /// rejected, since checkpoints are meant to be immutable.
    pub fn add(&mut self, height: u64, hash: Hash) -> Result<(), CheckpointConflict> {
        match self.points.get(&height) {
            Some(existing) if *existing != hash => Err(CheckpointConflict { height }),
            _ => {
                self.points.insert(height, hash);
                Ok(())
            }
        }
    }

    /// Returns the checkpointed hash at `height`, if any.
    #[must_use]
    pub fn hash_at(&self, height: u64) -> Option<Hash> {
        self.points.get(&height).copied()
    }

    /// `true` if no checkpoints have been configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns `true` if a reorganization touching `block_height`, observed
    /// while the chain's current tip is at `top_height`, is allowed.
    ///
    /// A reorg is disallowed iff there is a checkpoint at or below
    /// `block_height` that is also at or below the current tip — i.e. the
    /// checkpoint has already been passed, so rewriting at or below it would
    /// erase trusted history. `block_height == 0` (genesis) is never
    /// rewritable.
    #[must_use]
    pub fn is_allowed(&self, block_height: u64, top_height: u64) -> bool {
        if block_height == 0 {
            return false;
        }

        let Some((&checkpoint_height, _)) = self.points.range(..=block_height).next_back() else {
            return true;
        };

        top_height > checkpoint_height
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn h() -> Hash {
        Hash::ZERO
    }

    #[test]
    fn empty_checkpoints() {
        let cp = Checkpoints::new();
        assert!(!cp.is_allowed(0, 0));
        assert!(cp.is_allowed(1, 1));
        assert!(cp.is_allowed(1, 9));
        assert!(cp.is_allowed(9, 1));
    }

    #[test]
    fn one_checkpoint() {
        let mut cp = Checkpoints::new();
        cp.add(5, h()).unwrap();

        assert!(!cp.is_allowed(0, 0));

        for top in [1, 4, 5, 6, 9] {
            assert!(cp.is_allowed(1, top));
            assert!(cp.is_allowed(4, top));
        }

        assert!(!cp.is_allowed(5, 1));
        assert!(!cp.is_allowed(5, 4));
        assert!(!cp.is_allowed(5, 5));
        assert!(cp.is_allowed(5, 6));
        assert!(cp.is_allowed(5, 9));

        assert!(!cp.is_allowed(9, 1));
        assert!(!cp.is_allowed(9, 5));
        assert!(cp.is_allowed(9, 6));
        assert!(cp.is_allowed(9, 9));
    }

    #[test]
    fn two_checkpoints() {
        let mut cp = Checkpoints::new();
        cp.add(5, h()).unwrap();
        cp.add(9, h()).unwrap();

        assert!(!cp.is_allowed(0, 0));

        assert!(!cp.is_allowed(9, 9));
        assert!(cp.is_allowed(9, 10));

        assert!(!cp.is_allowed(10, 9));
        assert!(cp.is_allowed(10, 10));
    }

    #[test]
    fn conflicting_checkpoint_is_rejected() {
        let mut cp = Checkpoints::new();
        cp.add(5, Hash([1; 32])).unwrap();
        assert!(cp.add(5, Hash([2; 32])).is_err());
        assert!(cp.add(5, Hash([1; 32])).is_ok());
    }
}
