//! Aggregate counts over the full record set.

use serde::Serialize;

use crate::domain::{Doubt, DoubtStatus};

/// Dashboard counters. Derived from the record set, not from queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub answered: usize,
    pub general_pending: usize,
    pub priority_pending: usize,
}

impl QueueStats {
    /// Count `records` by status and tier.
    pub fn from_records(records: &[Doubt]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };

        for doubt in records {
            match doubt.status {
                DoubtStatus::Pending => {
                    stats.pending += 1;
                    if doubt.is_priority {
                        stats.priority_pending += 1;
                    } else {
                        stats.general_pending += 1;
                    }
                }
                DoubtStatus::Answered => stats.answered += 1,
            }
        }

        stats
    }

    /// Share of doubts answered, as a whole percent (0 when there are none).
    pub fn resolution_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.answered as f64 / self.total as f64) * 100.0).round() as u32
    }
}
