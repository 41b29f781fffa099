//! Outbox of stock mirrors that could not be pushed to the shop
//!
//! The stock value is absolute, so a newer pending mirror for the same book
//! replaces the older one instead of queueing behind it.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Book;

/// Stock value to copy from a book onto its shop product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockMirror {
    pub book_id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub stock: i64,
}

impl StockMirror {
    pub fn from_book(book: &Book) -> Option<Self> {
        Some(Self {
            book_id: book.id?,
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            stock: i64::from(book.available_copies),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Applied,
    /// Gave up after the maximum number of attempts
    Failed,
    /// No product matched; nothing to retry
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub mirror: StockMirror,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SyncOutbox {
    entries: Mutex<VecDeque<OutboxEntry>>,
    max_attempts: u32,
}

impl SyncOutbox {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Queue a mirror whose first push failed
    pub fn enqueue_failed(&self, mirror: StockMirror, error: &str) -> Uuid {
        self.push(mirror, OutboxStatus::Pending, Some(error.to_string()))
    }

    /// Keep a trace of a mirror that had no product to land on
    pub fn record_skipped(&self, mirror: StockMirror, reason: &str) -> Uuid {
        self.push(mirror, OutboxStatus::Skipped, Some(reason.to_string()))
    }

    fn push(&self, mirror: StockMirror, status: OutboxStatus, error: Option<String>) -> Uuid {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if status == OutboxStatus::Pending {
            // superseded: the newer stock value wins
            entries.retain(|e| {
                !(e.status == OutboxStatus::Pending && e.mirror.book_id == mirror.book_id)
            });
        }
        let now = Utc::now();
        let id = Uuid::new_v4();
        entries.push_back(OutboxEntry {
            id,
            mirror,
            status,
            attempts: u32::from(status == OutboxStatus::Pending),
            last_error: error,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// A later successful push makes any queued value for the book obsolete
    pub fn discard_pending_for(&self, book_id: i64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|e| !(e.status == OutboxStatus::Pending && e.mirror.book_id == book_id));
    }

    /// Pending entries, oldest first
    pub fn pending(&self) -> Vec<OutboxEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: Uuid) -> Option<OutboxEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn mark_applied(&self, id: Uuid) {
        self.update(id, |entry| {
            entry.status = OutboxStatus::Applied;
            entry.last_error = None;
        });
    }

    pub fn mark_skipped(&self, id: Uuid, reason: &str) {
        self.update(id, |entry| {
            entry.status = OutboxStatus::Skipped;
            entry.last_error = Some(reason.to_string());
        });
    }

    /// Count a failed retry; the entry fails for good at `max_attempts`
    pub fn mark_attempt_failed(&self, id: Uuid, error: &str) -> OutboxStatus {
        let max_attempts = self.max_attempts;
        self.update(id, |entry| {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
            if entry.attempts >= max_attempts {
                entry.status = OutboxStatus::Failed;
            }
        })
        .unwrap_or(OutboxStatus::Failed)
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut OutboxEntry)) -> Option<OutboxStatus> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.iter_mut().find(|e| e.id == id)?;
        f(entry);
        entry.updated_at = Utc::now();
        Some(entry.status)
    }

    /// Drop applied and skipped entries; failed ones stay visible
    pub fn prune_finished(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|e| matches!(e.status, OutboxStatus::Pending | OutboxStatus::Failed));
        before - entries.len()
    }
}
