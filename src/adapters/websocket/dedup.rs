//! Bounded recent-message-id set for instance-side duplicate suppression.
//!
//! The bus is at-least-once and the ephemeral echo races the durable
//! event, so the same message id can reach an instance more than once.
//! The first room-wide emission wins; later arrivals are dropped here.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::domain::MessageId;

/// FIFO-evicting set of recently delivered message ids.
pub struct RecentMessageIds {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    seen: HashSet<MessageId>,
    order: VecDeque<MessageId>,
}

impl RecentMessageIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                seen: HashSet::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Records the id and reports whether this is its first sighting.
    pub fn first_seen(&self, id: &MessageId) -> bool {
        let mut inner = self.inner.lock().expect("dedup lock poisoned");
        if !inner.seen.insert(*id) {
            return false;
        }
        inner.order.push_back(*id);
        if inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.seen.remove(&evicted);
            }
        }
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_sighting_is_suppressed() {
        let dedup = RecentMessageIds::new(8);
        let id = MessageId::new();
        assert!(dedup.first_seen(&id));
        assert!(!dedup.first_seen(&id));
    }

    #[test]
    fn distinct_ids_pass() {
        let dedup = RecentMessageIds::new(8);
        assert!(dedup.first_seen(&MessageId::new()));
        assert!(dedup.first_seen(&MessageId::new()));
    }

    #[test]
    fn capacity_bounds_memory() {
        let dedup = RecentMessageIds::new(4);
        let ids: Vec<MessageId> = (0..6).map(|_| MessageId::new()).collect();
        for id in &ids {
            assert!(dedup.first_seen(id));
        }
        assert_eq!(dedup.len(), 4);
        // The oldest two were evicted and would pass again; that is the
        // accepted trade-off of a bounded set - the client reconciles.
        assert!(dedup.first_seen(&ids[0]));
    }
}
