//! The notification store seam.
//!
//! [`NotificationStore`] is everything the sync engine needs from the
//! backend. [`HttpNotificationStore`](crate::api::HttpNotificationStore) is
//! the production implementation; tests substitute an in-memory store.

use raffle_core::notification::NotificationPage;
use raffle_core::types::DbId;

/// Errors from a notification store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the session credentials.
    #[error("Session is no longer authorized")]
    Unauthorized,

    /// The backend returned a non-2xx status code.
    #[error("Notification API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Remote notification storage.
#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    /// Fetch the most recent `page_size` notifications, optionally with
    /// aggregate statistics.
    async fn list_notifications(
        &self,
        page_size: u32,
        include_stats: bool,
    ) -> Result<NotificationPage, StoreError>;

    async fn mark_read(&self, ids: &[DbId]) -> Result<(), StoreError>;

    async fn mark_all_read(&self) -> Result<(), StoreError>;

    async fn delete_notification(&self, id: DbId) -> Result<(), StoreError>;
}
