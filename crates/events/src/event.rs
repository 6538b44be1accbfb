//! The typed event envelope carried by the subscription bus.

use serde::{Deserialize, Serialize};

use raffle_core::event_names::{NOTIFICATIONS_UPDATED, POLL_FAILED, SESSION_EXPIRED};
use raffle_core::notification::{Notification, NotificationPage, NotificationStats};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for decoding push frames into [`SyncEvent`]s.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The payload did not match the shape expected for the event name.
    #[error("Invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },
}

// ---------------------------------------------------------------------------
// SyncEvent
// ---------------------------------------------------------------------------

/// Payload of a `notifications_updated` event. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct NotificationsUpdatedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notifications: Option<Vec<Notification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stats: Option<NotificationStats>,
}

/// An event delivered to bus listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Fresh notification data. Listeners apply whichever fields are
    /// present and leave the rest untouched.
    NotificationsUpdated {
        notifications: Option<Vec<Notification>>,
        stats: Option<NotificationStats>,
    },

    /// The session is no longer valid.
    SessionExpired,

    /// A scheduled poll failed; `message` is the underlying error.
    PollFailed { message: String },

    /// An event this client does not interpret.
    Other {
        name: String,
        payload: serde_json::Value,
    },
}

impl SyncEvent {
    /// Build a full-replacement update from a fetched page.
    pub fn from_page(page: NotificationPage) -> Self {
        Self::NotificationsUpdated {
            notifications: Some(page.results),
            stats: page.stats,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &str {
        match self {
            Self::NotificationsUpdated { .. } => NOTIFICATIONS_UPDATED,
            Self::SessionExpired => SESSION_EXPIRED,
            Self::PollFailed { .. } => POLL_FAILED,
            Self::Other { name, .. } => name,
        }
    }

    /// JSON payload of the event, as it would appear in a push frame.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::NotificationsUpdated {
                notifications,
                stats,
            } => serde_json::to_value(NotificationsUpdatedPayload {
                notifications: notifications.clone(),
                stats: *stats,
            })
            .unwrap_or_default(),
            Self::SessionExpired => serde_json::json!({}),
            Self::PollFailed { message } => serde_json::json!({ "message": message }),
            Self::Other { payload, .. } => payload.clone(),
        }
    }

    /// Decode an `(event_name, payload)` pair.
    ///
    /// Unknown names become [`SyncEvent::Other`]; only a recognised name
    /// with a malformed payload is an error.
    pub fn from_parts(name: &str, payload: serde_json::Value) -> Result<Self, EventError> {
        match name {
            NOTIFICATIONS_UPDATED => {
                let decoded = if payload.is_null() {
                    NotificationsUpdatedPayload::default()
                } else {
                    serde_json::from_value::<NotificationsUpdatedPayload>(payload).map_err(
                        |e| EventError::InvalidPayload {
                            event: name.to_string(),
                            reason: e.to_string(),
                        },
                    )?
                };
                Ok(Self::NotificationsUpdated {
                    notifications: decoded.notifications,
                    stats: decoded.stats,
                })
            }
            SESSION_EXPIRED => Ok(Self::SessionExpired),
            POLL_FAILED => Ok(Self::PollFailed {
                message: payload["message"].as_str().unwrap_or_default().to_string(),
            }),
            _ => Ok(Self::Other {
                name: name.to_string(),
                payload,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
