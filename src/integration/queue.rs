//! Bounded FIFO of impact events: the hand-off between physics and audio.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::OverflowPolicy;
use crate::physics::impact::ImpactEvent;

/// Oldest-first ring buffer with a fixed capacity and an explicit overflow policy.
#[derive(Debug, Clone)]
pub struct ImpactEventQueue {
    events: VecDeque<ImpactEvent>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: u64,
}

impl Default for ImpactEventQueue {
    fn default() -> Self {
        ImpactEventQueue::new(256, OverflowPolicy::DropOldest)
    }
}

impl ImpactEventQueue {
    /// Capacity is floored at one.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        ImpactEventQueue {
            events: VecDeque::with_capacity(capacity),
            capacity,
            policy,
            dropped: 0,
        }
    }

    /// Append an event. Returns false if the incoming event was rejected.
    ///
    /// At capacity, [`OverflowPolicy::DropNewest`] rejects the event and
    /// [`OverflowPolicy::DropOldest`] evicts the head to make room.
    pub fn queue_impact(&mut self, event: ImpactEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            debug!(
                target: "impacts",
                "impact queue full ({}), policy {:?}, {} dropped so far",
                self.capacity,
                self.policy,
                self.dropped
            );
            match self.policy {
                OverflowPolicy::DropNewest => return false,
                OverflowPolicy::DropOldest => {
                    self.events.pop_front();
                }
            }
        }
        self.events.push_back(event);
        true
    }

    /// Pop the oldest event.
    pub fn dequeue_impact(&mut self) -> Option<ImpactEvent> {
        self.events.pop_front()
    }

    pub fn queue_size(&self) -> usize {
        self.events.len()
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Events lost to overflow since construction.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::object::PhysicsObject;
    use crate::physics::vector::Vector3;
    use crate::physics::world::PhysicsWorld;

    fn events(n: usize) -> Vec<ImpactEvent> {
        let mut world = PhysicsWorld::default();
        let h = world.add_object(PhysicsObject::new(1.0));
        (0..n)
            .map(|i| ImpactEvent::new(h, Vector3::new(i as f64, 0.0, 0.0), Vector3::UP, 0.5))
            .collect()
    }

    #[test]
    fn fifo_order() {
        let mut q = ImpactEventQueue::default();
        for e in events(3) {
            assert!(q.queue_impact(e));
        }
        assert_eq!(q.queue_size(), 3);
        let xs: Vec<f64> = std::iter::from_fn(|| q.dequeue_impact()).map(|e| e.position.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert!(!q.has_events());
        assert!(q.dequeue_impact().is_none());
    }

    #[test]
    fn drop_newest_rejects_incoming() {
        let mut q = ImpactEventQueue::new(2, OverflowPolicy::DropNewest);
        let evs = events(3);
        assert!(q.queue_impact(evs[0]));
        assert!(q.queue_impact(evs[1]));
        assert!(!q.queue_impact(evs[2]));
        assert_eq!(q.queue_size(), 2);
        assert_eq!(q.dropped_count(), 1);
        assert_eq!(q.dequeue_impact().map(|e| e.position.x), Some(0.0));
    }

    #[test]
    fn drop_oldest_evicts_head() {
        let mut q = ImpactEventQueue::new(2, OverflowPolicy::DropOldest);
        for e in events(3) {
            assert!(q.queue_impact(e));
        }
        assert_eq!(q.queue_size(), 2);
        assert_eq!(q.dropped_count(), 1);
        assert_eq!(q.dequeue_impact().map(|e| e.position.x), Some(1.0));
        assert_eq!(q.dequeue_impact().map(|e| e.position.x), Some(2.0));
    }

    #[test]
    fn zero_capacity_floored() {
        let q = ImpactEventQueue::new(0, OverflowPolicy::DropNewest);
        assert_eq!(q.capacity(), 1);
    }
}
