//! Scheduler for deciding which doubt to resolve next.
//!
//! Two tiers with absolute precedence: while the priority queue has anything
//! in it, the general queue is never consulted, however long its head has
//! been waiting.

use crate::domain::{Doubt, Tier};
use crate::queue::{OrderedQueue, PriorityEntry, PriorityQueue};
use crate::scheduler::projector::{self, Projection};

/// Owns both tier queues for one session.
#[derive(Debug, Default)]
pub struct Scheduler {
    general: OrderedQueue<Doubt>,
    priority: PriorityQueue<Doubt>,
}

impl Scheduler {
    /// Create a Scheduler with both queues empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Scheduler already projected from `records`.
    pub fn from_records(records: &[Doubt]) -> Self {
        let mut scheduler = Self::new();
        scheduler.rebuild(records);
        scheduler
    }

    /// Re-derive both queues from the full record set.
    pub fn rebuild(&mut self, records: &[Doubt]) -> Projection {
        projector::project(records, &mut self.general, &mut self.priority)
    }

    /// The doubt that should be resolved next, if any.
    pub fn next(&self) -> Option<&Doubt> {
        self.priority.front().or_else(|| self.general.front())
    }

    /// Head of the given tier's queue.
    pub fn front(&self, tier: Tier) -> Option<&Doubt> {
        match tier {
            Tier::Priority => self.priority.front(),
            Tier::General => self.general.front(),
        }
    }

    /// Drop a just-resolved doubt from the head of its tier's queue.
    ///
    /// Only the head may be removed this way. When `resolved` is not at the
    /// head (already gone, or another teacher got there first) nothing is
    /// removed and `None` is returned; the next rebuild restores consistency.
    pub fn dequeue_resolved(&mut self, resolved: &Doubt) -> Option<Doubt> {
        let tier = resolved.tier();
        let at_head = self.front(tier).is_some_and(|head| head.id == resolved.id);
        if !at_head {
            log::warn!(
                "Resolved doubt {} is not at the head of the {} queue; leaving queues for the next rebuild",
                resolved.id,
                tier
            );
            return None;
        }

        match tier {
            Tier::Priority => self.priority.dequeue(),
            Tier::General => self.general.dequeue(),
        }
    }

    /// 1-based place in overall service order; priority tier first.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.priority
            .iter()
            .chain(self.general.iter())
            .position(|d| d.id == id)
            .map(|index| index + 1)
    }

    /// General queue contents, head first.
    pub fn general_snapshot(&self) -> Vec<Doubt> {
        self.general.snapshot()
    }

    /// Priority queue contents in service order.
    pub fn priority_snapshot(&self) -> Vec<Doubt> {
        self.priority.snapshot()
    }

    /// Priority queue contents paired with the rank each was queued under.
    pub fn priority_snapshot_with_rank(&self) -> Vec<PriorityEntry<Doubt>> {
        self.priority.snapshot_with_priority()
    }

    pub fn general_len(&self) -> usize {
        self.general.len()
    }

    pub fn priority_len(&self) -> usize {
        self.priority.len()
    }

    /// Total doubts queued across both tiers.
    pub fn len(&self) -> usize {
        self.general.len() + self.priority.len()
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.priority.is_empty()
    }
}
