//! Queue projection: rebuild both tiers from the full record set.
//!
//! Every change to the record set re-derives the queues from scratch instead
//! of patching them incrementally. Cost is O(n log n) per change, which holds
//! up while a session has tens of pending doubts.

use std::cmp::Ordering;

use crate::domain::Doubt;
use crate::queue::{OrderedQueue, PriorityQueue};

/// Counts from one projection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projection {
    pub general: usize,
    pub priority: usize,
    /// Records skipped because they are no longer pending.
    pub skipped: usize,
}

/// Order by creation time, oldest first; records without a timestamp go last.
pub fn fifo_order(a: &Doubt, b: &Doubt) -> Ordering {
    match (&a.created_at, &b.created_at) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Pending doubts in canonical FIFO order.
///
/// The sort is stable, so records with equal (or missing) timestamps keep the
/// order the store delivered them in.
pub fn pending_in_fifo_order(records: &[Doubt]) -> Vec<&Doubt> {
    let mut pending: Vec<&Doubt> = records.iter().filter(|d| d.is_pending()).collect();
    pending.sort_by(|a, b| fifo_order(a, b));
    pending
}

/// Clear both queues and refill them from `records`.
///
/// Priority doubts are queued under their rank (1 when missing); everything
/// else goes to the general queue in FIFO order.
pub fn project(records: &[Doubt], general: &mut OrderedQueue<Doubt>, priority: &mut PriorityQueue<Doubt>) -> Projection {
    let pending = pending_in_fifo_order(records);

    general.clear();
    priority.clear();

    for doubt in &pending {
        if doubt.is_priority {
            priority.enqueue((*doubt).clone(), doubt.rank());
        } else {
            general.enqueue((*doubt).clone());
        }
    }

    let projection = Projection {
        general: general.len(),
        priority: priority.len(),
        skipped: records.len() - pending.len(),
    };

    tracing::debug!(
        general = projection.general,
        priority = projection.priority,
        skipped = projection.skipped,
        "Rebuilt doubt queues"
    );

    projection
}
