//! Background population of BUILDING entries.
//!
//! A `BuildJob` covers every building entry of one (owner, label). Each batch
//! walks the label's members in ascending id order from the lowest member
//! cursor, reads each entity's properties once and feeds every member that
//! has not yet passed the entity. The caller holds the store's read lock for
//! the duration of a batch, so no mutation can land between the read and the
//! cursor advance.

use crate::catalog::{BuildCursor, IndexEntry};
use crate::store::EntityStore;
use crate::types::{EntityKind, IndexState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Result of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// More entities remain, or members joined mid-batch
    Progress,
    /// Every member is OPERATIONAL (or dropped); the job is closed
    Finished,
    /// The graph was deleted; nothing was flipped
    Cancelled,
}

#[derive(Default)]
struct Members {
    entries: Vec<Arc<IndexEntry>>,
    /// no further members may join
    closed: bool,
}

pub struct BuildJob {
    owner: EntityKind,
    label: String,
    members: Mutex<Members>,
    batches: AtomicU64,
    visited: AtomicU64,
    started: Instant,
}

impl BuildJob {
    pub fn new(owner: EntityKind, label: &str, entries: Vec<Arc<IndexEntry>>) -> Self {
        Self {
            owner,
            label: label.to_string(),
            members: Mutex::new(Members { entries, closed: false }),
            batches: AtomicU64::new(0),
            visited: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn owner(&self) -> EntityKind {
        self.owner
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Batches run so far
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Entities read so far (each read once per batch, whatever the member count)
    pub fn entities_read(&self) -> u64 {
        self.visited.load(Ordering::Relaxed)
    }

    pub fn member_count(&self) -> usize {
        self.members.lock().entries.len()
    }

    pub fn is_closed(&self) -> bool {
        self.members.lock().closed
    }

    /// Add late members. They start at cursor 0; existing members keep their
    /// positions. Fails once the job has closed.
    pub fn try_join(&self, entries: &[Arc<IndexEntry>]) -> bool {
        let mut members = self.members.lock();
        if members.closed {
            return false;
        }
        members.entries.extend(entries.iter().cloned());
        true
    }

    /// Close the job and release its members
    pub(crate) fn close(&self) {
        let mut members = self.members.lock();
        members.closed = true;
        members.entries.clear();
    }

    /// Run one batch of at most `batch_size` entities against `store`.
    pub fn run_batch(&self, store: &EntityStore, batch_size: usize, cancel: &AtomicBool) -> BatchOutcome {
        if cancel.load(Ordering::Acquire) {
            self.close();
            return BatchOutcome::Cancelled;
        }

        let members: Vec<Arc<IndexEntry>> = {
            let mut members = self.members.lock();
            members.entries.retain(|e| !e.is_dropped());
            if members.entries.is_empty() {
                members.closed = true;
                return BatchOutcome::Finished;
            }
            members.entries.clone()
        };

        let from = members
            .iter()
            .map(|e| e.cursor().position())
            .min()
            .unwrap_or(BuildCursor::DONE);
        let page = store.members(self.owner).page(&self.label, from, batch_size.max(1));

        for &id in &page {
            // membership bitmaps are keyed by label hash
            if !store.carries(self.owner, id, &self.label) {
                tracing::trace!(label = %self.label, id, "not a member of the label, skipped");
                continue;
            }
            let Some(props) = store.properties(self.owner, id) else {
                tracing::trace!(label = %self.label, id, "entity vanished, skipped");
                continue;
            };
            for entry in &members {
                if entry.cursor().visited(id) || entry.is_dropped() {
                    continue;
                }
                if let Some(value) = props.get(entry.field()) {
                    entry.apply(id, Some(value));
                }
            }
        }

        let exhausted = page.len() < batch_size.max(1);
        let next = match page.last() {
            Some(&last) if !exhausted => u64::from(last) + 1,
            _ => BuildCursor::DONE,
        };
        for entry in &members {
            entry.cursor().advance_to(next);
        }

        let batch = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        self.visited.fetch_add(page.len() as u64, Ordering::Relaxed);
        tracing::debug!(
            owner = %self.owner,
            label = %self.label,
            batch,
            read = page.len(),
            cursor = next,
            members = members.len(),
            "index build batch"
        );

        if !exhausted {
            return BatchOutcome::Progress;
        }

        for entry in &members {
            if entry.is_dropped() {
                continue;
            }
            if entry.mark_operational() {
                tracing::info!(
                    index = %entry.key(),
                    indexed = entry.indexed(),
                    elapsed_ms = self.started.elapsed().as_millis() as u64,
                    "index operational"
                );
            }
        }

        let mut members = self.members.lock();
        members
            .entries
            .retain(|e| !e.is_dropped() && e.state() == IndexState::Building);
        if members.entries.is_empty() {
            members.closed = true;
            BatchOutcome::Finished
        } else {
            BatchOutcome::Progress
        }
    }
}
