//! The engine's observer-facing event queue.
//!
//! Observers are notified after a mutation commits, in commit order (spec
//! §5's ordering guarantee). Rather than calling back into arbitrary
//! observer code while still holding the engine's lock, the engine appends
//! events here and the caller drains the queue once the lock is released.

use std::collections::VecDeque;

use cryptonote_types::Hash;

/// Upper bound on queued-but-undrained events, so a caller that never polls
/// cannot grow the queue without bound.
const MAX_QUEUED_EVENTS: usize = 10_000;

/// Something observers (`blockchain_updated`, `pool_updated`,
/// `chain_switched`) care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainEvent {
    /// A block was appended to the main chain.
    BlockAdded {
        /// The new block's hash.
        hash: Hash,
        /// Its height.
        height: u64,
    },
    /// A reorganization replaced the main chain's tip segment.
    ChainSwitched {
        /// Height the fork point was found at.
        fork_height: u64,
        /// Hashes of the alt-chain blocks now on the main chain, in order.
        new_main_chain: Vec<Hash>,
    },
    /// The mempool's contents changed (admission or removal).
    PoolUpdated {
        /// The transaction hash that was added or removed.
        tx_hash: Hash,
    },
}

/// A bounded FIFO of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<BlockchainEvent>,
}

impl EventQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, dropping the oldest if the queue is at capacity —
    /// a caller that never drains has chosen to miss history rather than
    /// have the engine's memory grow unbounded.
    pub fn push(&mut self, event: BlockchainEvent) {
        if self.events.len() >= MAX_QUEUED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Drains every queued event, in commit order.
    pub fn drain(&mut self) -> Vec<BlockchainEvent> {
        self.events.drain(..).collect()
    }

    /// `true` if no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn drain_returns_events_in_commit_order() {
        let mut queue = EventQueue::new();
        queue.push(BlockchainEvent::BlockAdded {
            hash: Hash([1; 32]),
            height: 1,
        });
        queue.push(BlockchainEvent::PoolUpdated {
            tx_hash: Hash([2; 32]),
        });

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], BlockchainEvent::BlockAdded { height: 1, .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn push_beyond_capacity_drops_oldest() {
        let mut queue = EventQueue::new();
        for i in 0..MAX_QUEUED_EVENTS + 1 {
            queue.push(BlockchainEvent::PoolUpdated {
                tx_hash: Hash([(i % 256) as u8; 32]),
            });
        }
        assert_eq!(queue.drain().len(), MAX_QUEUED_EVENTS);
    }
}
