//! Bus poll source backed by the notification store.

use std::sync::Arc;

use raffle_events::{PollSource, SyncEvent};

use crate::store::{NotificationStore, StoreError};

/// Fetches the latest page on every bus poll and turns the outcome into
/// an event: a full `notifications_updated` on success, `session_expired`
/// on 401, `poll_failed` otherwise.
pub struct StorePoller {
    store: Arc<dyn NotificationStore>,
    page_size: u32,
}

impl StorePoller {
    pub fn new(store: Arc<dyn NotificationStore>, page_size: u32) -> Self {
        Self { store, page_size }
    }
}

#[async_trait::async_trait]
impl PollSource for StorePoller {
    async fn poll(&self) -> SyncEvent {
        match self.store.list_notifications(self.page_size, true).await {
            Ok(page) => SyncEvent::from_page(page),
            Err(StoreError::Unauthorized) => {
                tracing::warn!("Notification poll rejected, session expired");
                SyncEvent::SessionExpired
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notification poll failed");
                SyncEvent::PollFailed {
                    message: e.to_string(),
                }
            }
        }
    }
}
