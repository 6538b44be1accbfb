//! Countdown text, urgency bands, and draw phase resolution.
//!
//! All functions are pure: the caller injects "now". The client crate's
//! ticker owns a [`CountdownClock`] and calls [`CountdownClock::tick`] once
//! per second, so the displayed countdown never requires a network call
//! after the initial server time anchor.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Text displayed once the target instant has passed.
pub const EXPIRED_TEXT: &str = "Time's up!";

/// Clock advance applied by a single tick, in milliseconds.
pub const TICK_MILLIS: i64 = 1_000;

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_MINUTE: i64 = 60;

/// Below this many whole hours an hour-scale countdown is `Urgent`.
const URGENT_HOURS: i64 = 2;

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// Presentational band for the remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// At least one full day remaining.
    Normal,
    /// Two hours or more, under a day.
    Moderate,
    /// One to two hours.
    Urgent,
    /// Under an hour.
    Critical,
    /// Target reached.
    Expired,
}

impl Urgency {
    /// CSS modifier class for the countdown badge.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Normal => "countdown--normal",
            Self::Moderate => "countdown--moderate",
            Self::Urgent => "countdown--urgent",
            Self::Critical => "countdown--critical",
            Self::Expired => "countdown--expired",
        }
    }
}

// ---------------------------------------------------------------------------
// Countdown formatting
// ---------------------------------------------------------------------------

/// Formatted countdown for one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub text: String,
    pub urgency: Urgency,
    /// Whole seconds until the target, zero once expired.
    pub remaining_secs: i64,
}

/// Format the time left until `target` as seen from `now`.
///
/// Sub-second remainders are truncated, so a target 900 ms away renders as
/// `00:00` with `Critical` urgency; it only expires once the difference
/// reaches zero.
pub fn format_countdown(target: Timestamp, now: Timestamp) -> Countdown {
    let diff = target - now;
    if diff <= Duration::zero() {
        return Countdown {
            text: EXPIRED_TEXT.to_string(),
            urgency: Urgency::Expired,
            remaining_secs: 0,
        };
    }

    let total = diff.num_seconds();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    let (text, urgency) = if days > 0 {
        (
            format!("{days}d {hours:02}:{minutes:02}:{seconds:02}"),
            Urgency::Normal,
        )
    } else if hours > 0 {
        let urgency = if hours < URGENT_HOURS {
            Urgency::Urgent
        } else {
            Urgency::Moderate
        };
        (format!("{hours:02}:{minutes:02}:{seconds:02}"), urgency)
    } else {
        (format!("{minutes:02}:{seconds:02}"), Urgency::Critical)
    };

    Countdown {
        text,
        urgency,
        remaining_secs: total,
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Local clock corrected for server skew.
///
/// The offset is captured once at construction. Afterwards the clock only
/// moves through [`tick`](Self::tick), by exactly [`TICK_MILLIS`], so
/// progression is independent of timer jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownClock {
    offset: Duration,
    now: Timestamp,
}

impl CountdownClock {
    /// Seed the clock from the local time at mount and an optional server
    /// time anchor.
    pub fn new(local_now: Timestamp, server_anchor: Option<Timestamp>) -> Self {
        let offset = server_anchor.map_or_else(Duration::zero, |server| {
            clock_offset(server, local_now)
        });
        Self {
            offset,
            now: local_now + offset,
        }
    }

    /// Skew between server and local clocks captured at construction.
    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Current reading of the corrected clock.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Advance by one tick and return the new reading.
    pub fn tick(&mut self) -> Timestamp {
        self.now += Duration::milliseconds(TICK_MILLIS);
        self.now
    }
}

/// `server - local`, the amount to add to local readings.
pub fn clock_offset(server: Timestamp, local: Timestamp) -> Duration {
    server - local
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle stage of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No deadline; the draw is triggered by an admin.
    Manual,
    WaitingToStart,
    ParticipationActive,
    WaitingForDraw,
    Completed,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Manual => "Manual draw",
            Self::WaitingToStart => "Participation opens in",
            Self::ParticipationActive => "Participation closes in",
            Self::WaitingForDraw => "Draw in",
            Self::Completed => "Draw completed",
        }
    }
}

/// Remaining-time descriptor supplied by the backend with each draw.
///
/// Every field is a number of seconds relative to the moment the descriptor
/// was received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    #[serde(default)]
    pub until_participation_start: Option<i64>,
    #[serde(default)]
    pub until_participation_end: Option<i64>,
    #[serde(default)]
    pub until_draw: Option<i64>,
}

impl TimeRemaining {
    /// First applicable phase and its offset, in priority order
    /// start > end > draw. A field applies when it is strictly positive.
    pub fn active_phase(&self) -> (Phase, Option<i64>) {
        let candidates = [
            (Phase::WaitingToStart, self.until_participation_start),
            (Phase::ParticipationActive, self.until_participation_end),
            (Phase::WaitingForDraw, self.until_draw),
        ];
        candidates
            .into_iter()
            .find_map(|(phase, secs)| secs.filter(|s| *s > 0).map(|s| (phase, Some(s))))
            .unwrap_or((Phase::Completed, None))
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// What a countdown counts toward, and in which phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTarget {
    pub target: Option<Timestamp>,
    pub phase: Phase,
}

/// Everything the presentation layer needs for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownView {
    pub phase: Phase,
    pub label: &'static str,
    pub text: String,
    /// `None` when there is nothing to count down to.
    pub urgency: Option<Urgency>,
}

impl CountdownTarget {
    /// No deadline.
    pub fn manual() -> Self {
        Self {
            target: None,
            phase: Phase::Manual,
        }
    }

    /// Explicit instant with a caller-chosen phase.
    pub fn fixed(target: Timestamp, phase: Phase) -> Self {
        Self {
            target: Some(target),
            phase,
        }
    }

    /// Derive the target from a remaining-time descriptor received at `now`.
    ///
    /// Offsets too large to represent clamp to the latest instant chrono
    /// supports.
    pub fn from_time_remaining(remaining: &TimeRemaining, now: Timestamp) -> Self {
        let (phase, offset) = remaining.active_phase();
        Self {
            target: offset.map(|secs| {
                Duration::try_seconds(secs)
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(Timestamp::MAX_UTC)
            }),
            phase,
        }
    }

    /// Pick the target for a draw card.
    ///
    /// A descriptor wins over a bare target; a bare target is the draw
    /// instant; with neither the draw is manual.
    pub fn resolve(
        target: Option<Timestamp>,
        remaining: Option<&TimeRemaining>,
        now: Timestamp,
    ) -> Self {
        match (remaining, target) {
            (Some(remaining), _) => Self::from_time_remaining(remaining, now),
            (None, Some(target)) => Self::fixed(target, Phase::WaitingForDraw),
            (None, None) => Self::manual(),
        }
    }

    /// Evaluate the countdown at `now`.
    pub fn evaluate(&self, now: Timestamp) -> CountdownView {
        match self.target {
            Some(target) if self.phase != Phase::Manual => {
                let countdown = format_countdown(target, now);
                CountdownView {
                    phase: self.phase,
                    label: self.phase.label(),
                    text: countdown.text,
                    urgency: Some(countdown.urgency),
                }
            }
            _ => CountdownView {
                phase: self.phase,
                label: self.phase.label(),
                text: self.phase.label().to_string(),
                urgency: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
