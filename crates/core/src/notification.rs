//! Notification entity, unread arithmetic, and display helpers.
//!
//! The backend owns notifications; the client only mirrors the most recent
//! page of them plus the authoritative unread count. Local edits go through
//! the helpers here so the unread count can never underflow.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Default number of notifications requested per fetch.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page the backend will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// Enumerated notification type tag. Drives the icon shown next to the
/// notification in the bell dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    ParticipationConfirmed,
    DrawStarted,
    DrawCompleted,
    Winner,
    RouletteCreated,
    RouletteEndingSoon,
    System,
    Account,
    /// Any tag this client version does not know about.
    Other,
}

impl NotificationKind {
    /// Wire tag as sent by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParticipationConfirmed => "participation_confirmed",
            Self::DrawStarted => "draw_started",
            Self::DrawCompleted => "draw_completed",
            Self::Winner => "winner",
            Self::RouletteCreated => "roulette_created",
            Self::RouletteEndingSoon => "roulette_ending_soon",
            Self::System => "system",
            Self::Account => "account",
            Self::Other => "other",
        }
    }

    /// Icon name used by the presentation layer.
    pub fn icon(self) -> &'static str {
        match self {
            Self::ParticipationConfirmed => "ticket",
            Self::DrawStarted => "play-circle",
            Self::DrawCompleted => "flag-checkered",
            Self::Winner => "trophy",
            Self::RouletteCreated => "sparkles",
            Self::RouletteEndingSoon => "hourglass",
            Self::System => "cog",
            Self::Account => "user",
            Self::Other => "bell",
        }
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "participation_confirmed" => Self::ParticipationConfirmed,
            "draw_started" => Self::DrawStarted,
            "draw_completed" => Self::DrawCompleted,
            "winner" => Self::Winner,
            "roulette_created" => Self::RouletteCreated,
            "roulette_ending_soon" => Self::RouletteEndingSoon,
            "system" => Self::System,
            "account" => Self::Account,
            _ => Self::Other,
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Server-assigned priority. Absent on most notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Urgent,
    High,
    Normal,
    Low,
}

impl NotificationPriority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::High => "High",
            Self::Normal => "Normal",
            Self::Low => "Low",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A single notification as returned by the notification store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Option<NotificationPriority>,
    pub is_read: bool,
    pub created_at: Timestamp,
}

/// Aggregate statistics returned alongside a notification page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub unread_count: u64,
}

/// One page of notifications plus optional statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub results: Vec<Notification>,
    #[serde(default)]
    pub stats: Option<NotificationStats>,
}

// ---------------------------------------------------------------------------
// Unread arithmetic
// ---------------------------------------------------------------------------

/// Decrement an unread count, flooring at zero.
pub fn decrement_unread(current: u64, by: u64) -> u64 {
    current.saturating_sub(by)
}

/// Count the unread notifications in a slice.
pub fn count_unread(notifications: &[Notification]) -> u64 {
    notifications.iter().filter(|n| !n.is_read).count() as u64
}

/// Validate a requested page size against `1..=MAX_PAGE_SIZE`.
pub fn validate_page_size(size: u32) -> Result<(), CoreError> {
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(CoreError::Validation(format!(
            "Page size must be between 1 and {MAX_PAGE_SIZE}, got {size}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Relative age
// ---------------------------------------------------------------------------

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Short relative age label for a notification, e.g. `"5 min ago"`.
///
/// Timestamps in the future (clock skew) are reported as `"just now"`.
pub fn time_ago(created_at: Timestamp, now: Timestamp) -> String {
    let secs = (now - created_at).num_seconds();
    if secs < SECS_PER_MINUTE {
        "just now".to_string()
    } else if secs < SECS_PER_HOUR {
        format!("{} min ago", secs / SECS_PER_MINUTE)
    } else if secs < SECS_PER_DAY {
        format!("{} h ago", secs / SECS_PER_HOUR)
    } else {
        format!("{} d ago", secs / SECS_PER_DAY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
