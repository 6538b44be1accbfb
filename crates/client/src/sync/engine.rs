//! The notification sync engine.
//!
//! One engine serves one session. [`start`](NotificationSyncEngine::start)
//! subscribes to the bus, fetches immediately, and starts the bus poll;
//! [`stop`](NotificationSyncEngine::stop) undoes all three and discards the
//! session-owned state.
//!
//! Every start creates a fresh [`CancellationToken`] that acts as the
//! liveness flag. Completions check it while holding the state lock, so a
//! response that races with `stop()` is either applied before the reset or
//! discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use raffle_core::notification::Notification;
use raffle_core::session::SessionContext;
use raffle_core::types::DbId;
use raffle_events::{Subscription, SubscriptionBus, SyncEvent};
use tokio_util::sync::CancellationToken;

use crate::store::{NotificationStore, StoreError};
use crate::sync::poller::StorePoller;
use crate::sync::state::NotificationState;
use crate::sync::SyncConfig;

/// Message shown in the notification panel when a fetch fails.
pub const FETCH_ERROR_MESSAGE: &str = "Could not load notifications. Please try again.";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Notification sync is not running")]
    NotRunning,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Bookkeeping for one started session.
struct Run {
    user_id: DbId,
    cancel: CancellationToken,
    _subscription: Subscription,
}

struct EngineInner {
    store: Arc<dyn NotificationStore>,
    bus: Arc<SubscriptionBus>,
    config: SyncConfig,
    state: Mutex<NotificationState>,
    run: Mutex<Option<Run>>,
}

/// Keeps the local notification list and unread count in sync with the
/// store.
///
/// Cheap to clone; clones share the same state. The engine owns the bus
/// polling lifecycle, so a bus should serve a single engine.
#[derive(Clone)]
pub struct NotificationSyncEngine {
    inner: Arc<EngineInner>,
}

impl NotificationSyncEngine {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        bus: Arc<SubscriptionBus>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                bus,
                config,
                state: Mutex::new(NotificationState::default()),
                run: Mutex::new(None),
            }),
        }
    }

    // ---- lifecycle ----

    /// Start syncing for the session's user.
    ///
    /// Without a session user this only stops any previous run and
    /// returns `false`. A running engine is restarted. The initial fetch is
    /// awaited; its failure is surfaced through the state's error field.
    /// Also returns `false` when a concurrent `start` or `stop` superseded
    /// this call before polling began.
    pub async fn start(&self, session: &SessionContext) -> bool {
        let Some(user) = session.user.as_ref() else {
            self.stop();
            tracing::debug!("No session user, notification sync not started");
            return false;
        };

        let cancel = CancellationToken::new();
        let subscription = self.listen(cancel.clone());

        // Swap under one lock so a concurrent start can never orphan a live run.
        let previous = self.inner.lock_run().replace(Run {
            user_id: user.id,
            cancel: cancel.clone(),
            _subscription: subscription,
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
            drop(previous);
            self.inner.apply(&cancel, NotificationState::clear);
            tracing::debug!("Previous notification sync replaced");
        }

        let poller = StorePoller::new(Arc::clone(&self.inner.store), self.inner.config.page_size);
        self.inner
            .bus
            .start_polling(self.inner.config.poll_interval, Arc::new(poller));
        if cancel.is_cancelled() {
            // Stopped or replaced while polling was being set up.
            if !self.is_running() {
                self.inner.bus.stop_polling();
            }
            return false;
        }

        tracing::info!(
            user_id = user.id,
            poll_interval_secs = self.inner.config.poll_interval.as_secs(),
            "Notification sync started",
        );

        // Already logged and recorded in state.
        let _ = self.inner.fetch(&cancel).await;
        true
    }

    /// Stop polling, unsubscribe, and discard the session's notifications.
    ///
    /// Pending reconciliation fetches and in-flight responses observe the
    /// cancelled token and leave state untouched.
    pub fn stop(&self) {
        let Some(run) = self.inner.lock_run().take() else {
            return;
        };

        self.inner.bus.stop_polling();
        run.cancel.cancel();
        drop(run);

        self.inner.lock_state().clear();
        tracing::info!("Notification sync stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_run().is_some()
    }

    /// User the engine is currently syncing for.
    pub fn user_id(&self) -> Option<DbId> {
        self.inner.lock_run().as_ref().map(|r| r.user_id)
    }

    // ---- reads ----

    /// Copy of the current local state.
    pub fn snapshot(&self) -> NotificationState {
        self.inner.lock_state().clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.inner.lock_state().unread_count
    }

    pub fn unread_notifications(&self) -> Vec<Notification> {
        self.inner.lock_state().unread().cloned().collect()
    }

    // ---- operations ----

    /// Replace the local list with the latest page from the store.
    ///
    /// On failure the previous list is kept and the error message is set.
    pub async fn fetch(&self) -> Result<(), SyncError> {
        let token = self.inner.live_token()?;
        self.inner.fetch(&token).await
    }

    /// Fetch immediately to reconcile optimistic edits.
    pub async fn reconcile(&self) -> Result<(), SyncError> {
        self.fetch().await
    }

    /// Clear the error and fetch again.
    pub async fn retry(&self) -> Result<(), SyncError> {
        let token = self.inner.live_token()?;
        self.inner.apply(&token, NotificationState::dismiss_error);
        self.inner.fetch(&token).await
    }

    pub fn dismiss_error(&self) {
        self.inner.lock_state().dismiss_error();
    }

    /// Mark a single notification read.
    pub async fn mark_read_one(&self, id: DbId) -> Result<(), SyncError> {
        self.mark_read([id]).await
    }

    /// Mark a batch of notifications read.
    ///
    /// The local flags and count change before the remote call is issued.
    /// A remote failure is logged and recorded as drift; it is not rolled
    /// back. A reconciliation fetch is scheduled either way.
    pub async fn mark_read<I>(&self, ids: I) -> Result<(), SyncError>
    where
        I: IntoIterator<Item = DbId>,
    {
        let token = self.inner.live_token()?;
        let ids: Vec<DbId> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(());
        }

        self.inner.apply(&token, |s| s.mark_read(&ids));

        if let Err(e) = self.inner.store.mark_read(&ids).await {
            tracing::warn!(error = %e, count = ids.len(), "Failed to mark notifications read");
            self.inner.apply(&token, NotificationState::mutation_failed);
        }

        self.inner.schedule_reconcile(token);
        Ok(())
    }

    /// Mark every held notification read and zero the count.
    pub async fn mark_all_read(&self) -> Result<(), SyncError> {
        let token = self.inner.live_token()?;

        self.inner.apply(&token, NotificationState::mark_all_read);

        if let Err(e) = self.inner.store.mark_all_read().await {
            tracing::warn!(error = %e, "Failed to mark all notifications read");
            self.inner.apply(&token, NotificationState::mutation_failed);
        }

        self.inner.schedule_reconcile(token);
        Ok(())
    }

    /// Delete a notification remotely, then drop it locally.
    ///
    /// Returns whether an item was removed from the local list. A remote
    /// failure is logged and leaves state untouched.
    pub async fn delete(&self, id: DbId) -> Result<bool, SyncError> {
        let token = self.inner.live_token()?;

        if let Err(e) = self.inner.store.delete_notification(id).await {
            tracing::warn!(error = %e, notification_id = id, "Failed to delete notification");
            return Ok(false);
        }

        let mut removed = false;
        self.inner.apply(&token, |s| removed = s.remove(id).is_some());
        Ok(removed)
    }

    // ---- private helpers ----

    /// Subscribe a listener bound to this run's token.
    fn listen(&self, token: CancellationToken) -> Subscription {
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        self.inner.bus.add_listener(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(&token, event);
            }
        })
    }
}

impl EngineInner {
    fn lock_state(&self) -> MutexGuard<'_, NotificationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_token(&self) -> Result<CancellationToken, SyncError> {
        self.lock_run()
            .as_ref()
            .map(|r| r.cancel.clone())
            .ok_or(SyncError::NotRunning)
    }

    /// Run `f` against the state unless `token` has been cancelled.
    fn apply<F>(&self, token: &CancellationToken, f: F) -> bool
    where
        F: FnOnce(&mut NotificationState),
    {
        let mut state = self.lock_state();
        if token.is_cancelled() {
            return false;
        }
        f(&mut state);
        true
    }

    async fn fetch(&self, token: &CancellationToken) -> Result<(), SyncError> {
        match self
            .store
            .list_notifications(self.config.page_size, true)
            .await
        {
            Ok(page) => {
                let count = page.results.len();
                if self.apply(token, |s| s.replace(page)) {
                    tracing::debug!(count, "Notifications fetched");
                } else {
                    tracing::debug!("Discarding notifications fetched after stop");
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch notifications");
                let expired = matches!(e, StoreError::Unauthorized);
                let live = self.apply(token, |s| s.fetch_failed(FETCH_ERROR_MESSAGE));
                if expired && live {
                    self.bus.publish(SyncEvent::SessionExpired);
                }
                Err(e.into())
            }
        }
    }

    /// Fetch again after the reconcile delay, unless the run ends first.
    fn schedule_reconcile(self: &Arc<Self>, token: CancellationToken) {
        let inner = Arc::clone(self);
        let delay = self.config.reconcile_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            // Already logged and recorded in state.
            let _ = inner.fetch(&token).await;
        });
    }

    fn handle_event(&self, token: &CancellationToken, event: &SyncEvent) {
        match event {
            SyncEvent::NotificationsUpdated {
                notifications,
                stats,
            } => {
                self.apply(token, |s| s.apply_update(notifications.clone(), *stats));
            }
            SyncEvent::SessionExpired => {
                if self.apply(token, NotificationState::clear) {
                    tracing::info!("Session expired, notifications cleared");
                }
            }
            SyncEvent::PollFailed { message } => {
                tracing::debug!(error = %message, "Recording failed poll");
                self.apply(token, |s| s.fetch_failed(FETCH_ERROR_MESSAGE));
            }
            SyncEvent::Other { name, .. } => {
                tracing::debug!(event = %name, "Ignoring unrecognised bus event");
            }
        }
    }
}
