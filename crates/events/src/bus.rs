//! In-process subscription bus with typed unsubscribe handles.
//!
//! [`SubscriptionBus`] fans every published [`SyncEvent`] out to the
//! registered listeners, synchronously and in registration order. It also
//! owns at most one polling task: [`start_polling`](SubscriptionBus::start_polling)
//! and [`stop_polling`](SubscriptionBus::stop_polling) are a symmetric pair,
//! and dropping the bus stops polling as well.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::event::SyncEvent;

/// A bus listener. Receives `(event_name, payload)` through the typed event.
pub type Listener = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

type ListenerMap = RwLock<BTreeMap<u64, Listener>>;

// ---------------------------------------------------------------------------
// PollSource
// ---------------------------------------------------------------------------

/// Something the bus can poll on a fixed interval.
///
/// Implementations map their own failures into an event (typically
/// [`SyncEvent::PollFailed`] or [`SyncEvent::SessionExpired`]) so the bus
/// never needs to know the source's error type.
#[async_trait::async_trait]
pub trait PollSource: Send + Sync {
    async fn poll(&self) -> SyncEvent;
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle returned by [`SubscriptionBus::add_listener`].
///
/// The listener stays registered until [`unsubscribe`](Self::unsubscribe)
/// is called or the handle is dropped.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener from the bus.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ---------------------------------------------------------------------------
// SubscriptionBus
// ---------------------------------------------------------------------------

/// Background poll task owned by the bus.
struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Listener registry plus the polling lifecycle.
///
/// Designed to be shared via `Arc<SubscriptionBus>`.
pub struct SubscriptionBus {
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
    polling: Mutex<Option<PollTask>>,
}

impl SubscriptionBus {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
            polling: Mutex::new(None),
        }
    }

    /// Register a listener. Keep the returned handle for as long as the
    /// listener should receive events.
    pub fn add_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(listener));
        tracing::debug!(subscription_id = id, "Listener added");
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver an event to every registered listener.
    ///
    /// Listeners are invoked outside the registry lock, so a listener may
    /// itself subscribe, unsubscribe, or publish.
    pub fn publish(&self, event: SyncEvent) {
        dispatch(&self.listeners, &event);
    }

    /// Start polling `source` every `interval`, publishing each result.
    ///
    /// The first poll happens one full interval after this call. Any poll
    /// task already running is stopped first. Must be called from within a
    /// Tokio runtime.
    pub fn start_polling(&self, interval: Duration, source: Arc<dyn PollSource>) {
        self.stop_polling();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let listeners = Arc::clone(&self.listeners);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let event = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    event = source.poll() => event,
                };

                tracing::debug!(event = event.name(), "Poll completed");
                dispatch(&listeners, &event);
            }

            tracing::debug!("Poll task stopped");
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "Polling started");
        *self.polling.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(PollTask { cancel, handle });
    }

    /// Stop the poll task, if any. Safe to call repeatedly.
    ///
    /// An in-flight poll is abandoned and its result is never published.
    pub fn stop_polling(&self) {
        let task = self
            .polling
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            task.cancel.cancel();
            task.handle.abort();
            tracing::info!("Polling stopped");
        }
    }

    /// Whether a poll task is currently registered.
    pub fn is_polling(&self) -> bool {
        self.polling
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Default for SubscriptionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionBus {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

fn dispatch(listeners: &ListenerMap, event: &SyncEvent) {
    let snapshot: Vec<Listener> = listeners
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .cloned()
        .collect();

    for listener in snapshot {
        listener(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
