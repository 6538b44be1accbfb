//! Local notification state and its optimistic transitions.
//!
//! Every mutation of the mirrored list goes through [`NotificationState`],
//! which also tracks the two-phase [`SyncStatus`] of optimistic edits.

use raffle_core::notification::{
    count_unread, decrement_unread, Notification, NotificationPage, NotificationStats,
};
use raffle_core::types::DbId;

/// Reconciliation status of the local state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Local state mirrors the last authoritative sync.
    #[default]
    Confirmed,
    /// Optimistic edits applied; the remote acknowledgement or the
    /// reconciliation fetch is outstanding.
    PendingOptimistic,
    /// A remote mutation failed. Local state may diverge from the server
    /// until the next successful fetch.
    DriftPending,
}

/// The engine's mirror of the user's notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    /// User-facing fetch error, cleared by the next successful fetch.
    pub error: Option<String>,
    pub status: SyncStatus,
}

impl NotificationState {
    /// Replace list and count wholesale with an authoritative page.
    ///
    /// Falls back to counting the page when the backend sent no stats.
    pub fn replace(&mut self, page: NotificationPage) {
        self.unread_count = page
            .stats
            .map(|s| s.unread_count)
            .unwrap_or_else(|| count_unread(&page.results));
        self.notifications = page.results;
        self.error = None;
        self.status = SyncStatus::Confirmed;
    }

    /// Apply a pushed update, touching only the fields that are present.
    ///
    /// An update carrying both fields is authoritative.
    pub fn apply_update(
        &mut self,
        notifications: Option<Vec<Notification>>,
        stats: Option<NotificationStats>,
    ) {
        let complete = notifications.is_some() && stats.is_some();
        if let Some(list) = notifications {
            self.notifications = list;
        }
        if let Some(stats) = stats {
            self.unread_count = stats.unread_count;
        }
        if complete {
            self.error = None;
            self.status = SyncStatus::Confirmed;
        }
    }

    /// Record a failed fetch. The list is kept as-is.
    pub fn fetch_failed(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Optimistically mark `ids` read and decrement the count by the batch
    /// size, flooring at zero.
    pub fn mark_read(&mut self, ids: &[DbId]) {
        for n in self.notifications.iter_mut() {
            if ids.contains(&n.id) {
                n.is_read = true;
            }
        }
        self.unread_count = decrement_unread(self.unread_count, ids.len() as u64);
        self.begin_optimistic();
    }

    /// Optimistically mark everything read.
    pub fn mark_all_read(&mut self) {
        for n in self.notifications.iter_mut() {
            n.is_read = true;
        }
        self.unread_count = 0;
        self.begin_optimistic();
    }

    /// Remove a notification after the backend confirmed its deletion.
    ///
    /// Returns the removed item. The count only moves when the removed item
    /// was unread, so removing an id twice decrements at most once.
    pub fn remove(&mut self, id: DbId) -> Option<Notification> {
        let index = self.notifications.iter().position(|n| n.id == id)?;
        let removed = self.notifications.remove(index);
        if !removed.is_read {
            self.unread_count = decrement_unread(self.unread_count, 1);
        }
        Some(removed)
    }

    /// A remote mutation failed after its optimistic edit was applied.
    pub fn mutation_failed(&mut self) {
        self.status = SyncStatus::DriftPending;
    }

    /// Discard everything, as when the session ends.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| !n.is_read)
    }

    fn begin_optimistic(&mut self) {
        if self.status != SyncStatus::DriftPending {
            self.status = SyncStatus::PendingOptimistic;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
