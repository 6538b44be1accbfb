//! Raffle subscription bus.
//!
//! This crate provides the event fan-out the notification sync engine
//! listens on:
//!
//! - [`SyncEvent`]: the typed `(event_name, payload)` envelope.
//! - [`SubscriptionBus`]: in-process listener registry with typed
//!   [`Subscription`] handles and symmetric
//!   [`start_polling`](SubscriptionBus::start_polling) /
//!   [`stop_polling`](SubscriptionBus::stop_polling).
//! - [`PollSource`]: the seam a poller implements to feed the bus.

pub mod bus;
pub mod event;

pub use bus::{PollSource, Subscription, SubscriptionBus};
pub use event::{EventError, SyncEvent};
