//! Well-known subscription bus event name constants.
//!
//! These must match the `event` field of push frames sent by the backend
//! and the names reported by `SyncEvent::name` in `raffle-events`.

/// A fresh notification list and/or unread statistics are available.
pub const NOTIFICATIONS_UPDATED: &str = "notifications_updated";

/// The backend rejected the session token; local session state must be
/// discarded.
pub const SESSION_EXPIRED: &str = "session_expired";

/// A scheduled poll of the notification store failed.
pub const POLL_FAILED: &str = "poll_failed";
