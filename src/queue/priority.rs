//! Rank-ordered queue for the priority tier.
//!
//! Entries are kept sorted ascending by rank at all times. A new entry goes
//! immediately before the first entry with a strictly greater rank, so equal
//! ranks stay in arrival order without ever resorting the sequence. Enqueue is
//! a linear scan; the tier holds tens of entries, not thousands.

use std::collections::VecDeque;

/// An item paired with the rank it was queued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityEntry<T> {
    pub item: T,
    pub priority: u32,
}

/// Stable min-rank queue.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    entries: VecDeque<PriorityEntry<T>>,
}

impl<T> PriorityQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Insert `item` at `priority`; lower ranks are served first.
    pub fn enqueue(&mut self, item: T, priority: u32) {
        let entry = PriorityEntry { item, priority };
        match self.entries.iter().position(|e| e.priority > priority) {
            Some(index) => self.entries.insert(index, entry),
            None => self.entries.push_back(entry),
        }
    }

    /// Remove and return the most urgent item.
    pub fn dequeue(&mut self) -> Option<T> {
        self.entries.pop_front().map(|e| e.item)
    }

    /// Peek at the most urgent item.
    pub fn front(&self) -> Option<&T> {
        self.entries.front().map(|e| &e.item)
    }

    /// Rank of the head entry.
    pub fn front_priority(&self) -> Option<u32> {
        self.entries.front().map(|e| e.priority)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate in service order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }
}

impl<T: Clone> PriorityQueue<T> {
    /// Owned copy of the items in service order.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Owned copy of the entries with their ranks, for visualization.
    pub fn snapshot_with_priority(&self) -> Vec<PriorityEntry<T>> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
