//! Per-client doubt session.
//!
//! A `DoubtSession` owns the authoritative copy of the record set for one
//! client, the scheduler derived from it, and a subscription to the record
//! store's change stream. Every confirmed change to the record set is
//! followed by a full rebuild of both queues.
//!
//! Everything here runs on one logical thread of control. Store calls are
//! awaited before any local state is touched, so the queues never run ahead
//! of what the store has confirmed.

use std::str::FromStr;

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::domain::{ChangeEvent, ChangeKind, Doubt, DoubtStatus, Identity, NewDoubt, Ranks};
use crate::error::{DoubtqError, Result};
use crate::queue::PriorityEntry;
use crate::scheduler::{QueueStats, Scheduler, fifo_order};
use crate::storage::RecordStore;

/// Which records a history listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    #[default]
    All,
    Pending,
    Answered,
}

impl FromStr for HistoryFilter {
    type Err = DoubtqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "answered" => Ok(Self::Answered),
            other => Err(DoubtqError::InvalidInput(format!("unknown history filter: {}", other))),
        }
    }
}

impl HistoryFilter {
    fn admits(&self, doubt: &Doubt) -> bool {
        match self {
            Self::All => true,
            Self::Pending => doubt.status == DoubtStatus::Pending,
            Self::Answered => doubt.status == DoubtStatus::Answered,
        }
    }
}

/// Creation-time order for a history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = DoubtqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(DoubtqError::InvalidInput(format!("unknown sort order: {}", other))),
        }
    }
}

/// One client's view of the doubt queue.
pub struct DoubtSession<R: RecordStore> {
    store: R,
    identity: Identity,
    ranks: Ranks,
    records: Vec<Doubt>,
    scheduler: Scheduler,
    events: broadcast::Receiver<ChangeEvent>,
    /// Set when events were dropped and the store has not been reloaded since.
    reload_pending: bool,
}

impl<R: RecordStore> DoubtSession<R> {
    /// Subscribe to `store`, load the full record set and project the queues.
    ///
    /// The subscription is taken before loading so no change can slip in
    /// between the two; a change seen both ways is absorbed by `apply`.
    pub async fn open(store: R, identity: Identity) -> Result<Self> {
        let events = store.subscribe();
        let records = store.load_all().await?;
        let scheduler = Scheduler::from_records(&records);
        log::info!(
            "Opened session for {} with {} doubts ({} queued)",
            identity.id,
            records.len(),
            scheduler.len()
        );
        Ok(Self {
            store,
            identity,
            ranks: Ranks::default(),
            records,
            scheduler,
            events,
            reload_pending: false,
        })
    }

    /// Use `ranks` for doubts submitted from this session.
    pub fn with_ranks(mut self, ranks: Ranks) -> Self {
        self.ranks = ranks;
        self
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The full record set, answered doubts included.
    pub fn records(&self) -> &[Doubt] {
        &self.records
    }

    /// Patch the record set with one change and rebuild the queues.
    ///
    /// Events may arrive more than once and out of order. Inserts and updates
    /// both upsert by id, deletes remove by id, and nothing moves an answered
    /// record back to pending. Returns whether the set changed.
    pub fn apply(&mut self, event: ChangeEvent) -> bool {
        let id = event.record_id().to_string();
        let position = self.records.iter().position(|d| d.id == id);

        let changed = match (event.kind, position) {
            (ChangeKind::Insert | ChangeKind::Update, None) => {
                self.records.push(event.record);
                true
            }
            (ChangeKind::Insert | ChangeKind::Update, Some(index)) => {
                let current = &self.records[index];
                if *current == event.record || is_stale(current, &event.record) {
                    false
                } else {
                    self.records[index] = event.record;
                    true
                }
            }
            (ChangeKind::Delete, Some(index)) => {
                self.records.remove(index);
                true
            }
            (ChangeKind::Delete, None) => false,
        };

        log::debug!("Applied {:?} for {} (changed: {})", event.kind, id, changed);
        if changed {
            self.scheduler.rebuild(&self.records);
        }
        changed
    }

    /// Apply every change event waiting on the subscription, in arrival order.
    ///
    /// If the subscription fell behind and dropped events, the record set is
    /// reloaded from the store afterwards. A failed reload is retried on the
    /// next call. Returns how many events were applied.
    pub async fn sync(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    log::warn!("Change stream lagged by {} events, reloading", missed);
                    self.reload_pending = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if self.reload_pending {
            self.refresh().await?;
        }
        Ok(applied)
    }

    /// Catch up after a confirmed store write.
    ///
    /// The write already succeeded, so a failed catch-up is only logged; the
    /// next `sync` or `refresh` rebuilds from the store.
    async fn sync_after_write(&mut self) {
        if let Err(e) = self.sync().await {
            log::warn!("Catch-up after store write failed: {}", e);
        }
    }

    /// Wait for the next change event, apply it, and return it.
    ///
    /// Returns `None` once the store has gone away.
    pub async fn recv(&mut self) -> Result<Option<ChangeEvent>> {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    self.apply(event.clone());
                    return Ok(Some(event));
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("Change stream lagged by {} events, reloading", missed);
                    self.reload_pending = true;
                    self.refresh().await?;
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }

    /// Reload the full record set from the store and rebuild.
    pub async fn refresh(&mut self) -> Result<()> {
        let records = self.store.load_all().await.inspect_err(|e| {
            log::warn!("Failed to reload doubts: {}", e);
        })?;
        self.records = records;
        self.reload_pending = false;
        self.scheduler.rebuild(&self.records);
        Ok(())
    }

    /// The doubt a teacher should resolve next.
    pub fn next(&self) -> Option<&Doubt> {
        self.scheduler.next()
    }

    /// General queue, head first.
    pub fn general_queue(&self) -> Vec<Doubt> {
        self.scheduler.general_snapshot()
    }

    /// Priority queue, in service order.
    pub fn priority_queue(&self) -> Vec<Doubt> {
        self.scheduler.priority_snapshot()
    }

    /// Priority queue with ranks, for visualization.
    pub fn priority_queue_with_rank(&self) -> Vec<PriorityEntry<Doubt>> {
        self.scheduler.priority_snapshot_with_rank()
    }

    /// Counts over the full record set.
    pub fn stats(&self) -> QueueStats {
        QueueStats::from_records(&self.records)
    }

    /// Ask a question as this session's identity.
    pub async fn submit(&mut self, title: &str, description: &str, is_priority: bool) -> Result<Doubt> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DoubtqError::InvalidInput("title must not be empty".to_string()));
        }

        let fields = NewDoubt::new(title, description.trim(), is_priority, self.identity.clone())
            .with_priority(self.ranks.for_priority(is_priority));
        let created = self.store.create_record(fields).await.inspect_err(|e| {
            log::warn!("Failed to create doubt: {}", e);
        })?;

        // The store's own insert event may or may not reach us; either way the
        // record lands exactly once.
        self.apply(ChangeEvent::insert(created.clone()));
        self.sync_after_write().await;
        Ok(created)
    }

    /// Answer a doubt as this session's identity.
    ///
    /// The store is updated first; only once it confirms does the doubt leave
    /// its queue. Resolving anything but the head of its queue still persists
    /// the answer, and the following rebuild brings the queues back in line.
    pub async fn resolve(&mut self, id: &str, answer: &str) -> Result<Doubt> {
        let doubt = self
            .records
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| DoubtqError::NotFound(id.to_string()))?;

        let resolved = self
            .store
            .resolve_record(id, answer, &self.identity.id)
            .await
            .inspect_err(|e| {
                log::warn!("Failed to resolve doubt {}: {}", id, e);
            })?;

        self.scheduler.dequeue_resolved(&doubt);
        self.apply(ChangeEvent::update(resolved.clone()));
        self.sync_after_write().await;
        Ok(resolved)
    }

    /// Resolve whatever `next()` currently points at.
    pub async fn resolve_next(&mut self, answer: &str) -> Result<Option<Doubt>> {
        let Some(id) = self.next().map(|d| d.id.clone()) else {
            return Ok(None);
        };
        self.resolve(&id, answer).await.map(Some)
    }

    /// Timeline view of the full record set.
    ///
    /// Records without a creation time sort last in either order.
    pub fn history(&self, filter: HistoryFilter, order: SortOrder) -> Vec<&Doubt> {
        let mut doubts: Vec<&Doubt> = self.records.iter().filter(|d| filter.admits(d)).collect();
        match order {
            SortOrder::Oldest => doubts.sort_by(|a, b| fifo_order(a, b)),
            SortOrder::Newest => doubts.sort_by(|a, b| match (&a.created_at, &b.created_at) {
                (Some(x), Some(y)) => y.cmp(x),
                _ => fifo_order(a, b),
            }),
        }
        doubts
    }

    /// Every doubt asked by one student, oldest first.
    pub fn by_student(&self, student_id: &str) -> Vec<&Doubt> {
        let mut doubts: Vec<&Doubt> = self
            .records
            .iter()
            .filter(|d| d.student_id.as_deref() == Some(student_id))
            .collect();
        doubts.sort_by(|a, b| fifo_order(a, b));
        doubts
    }
}

/// An incoming copy is stale if it would reopen an answered record.
fn is_stale(current: &Doubt, incoming: &Doubt) -> bool {
    current.status.is_terminal() && !incoming.status.is_terminal()
}
