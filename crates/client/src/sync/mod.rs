//! Notification synchronization.
//!
//! [`NotificationSyncEngine`] keeps a bounded, recent view of the user's
//! notifications consistent with the [`NotificationStore`](crate::store::NotificationStore)
//! through an immediate fetch, a recurring bus poll, pushed bus events, and
//! optimistic local edits reconciled by a delayed re-fetch.

pub mod engine;
pub mod poller;
pub mod state;

use std::time::Duration;

use raffle_core::notification::DEFAULT_PAGE_SIZE;

pub use engine::{NotificationSyncEngine, SyncError, FETCH_ERROR_MESSAGE};
pub use poller::StorePoller;
pub use state::{NotificationState, SyncStatus};

/// Default interval between bus polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default delay before the confirmatory fetch after a read receipt.
pub const DEFAULT_RECONCILE_DELAY: Duration = Duration::from_millis(450);

/// Tunables for [`NotificationSyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub page_size: u32,
    pub reconcile_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            reconcile_delay: DEFAULT_RECONCILE_DELAY,
        }
    }
}
