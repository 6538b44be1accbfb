//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Notify;

use raffle_client::store::{NotificationStore, StoreError};
use raffle_core::notification::{
    count_unread, Notification, NotificationKind, NotificationPage, NotificationPriority,
    NotificationStats,
};
use raffle_core::session::{SessionContext, SessionUser};
use raffle_core::types::DbId;
use raffle_events::{SubscriptionBus, SyncEvent};

/// Build a notification with a deterministic timestamp.
pub fn notification(id: DbId, is_read: bool) -> Notification {
    Notification {
        id,
        kind: NotificationKind::ParticipationConfirmed,
        title: format!("Entry #{id} confirmed"),
        message: "You're in the draw".to_string(),
        priority: Some(NotificationPriority::Normal),
        is_read,
        created_at: Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap() + Duration::minutes(id),
    }
}

/// An authenticated session for user 7.
pub fn session() -> SessionContext {
    SessionContext::authenticated(
        SessionUser {
            id: 7,
            username: "ana".to_string(),
            is_admin: false,
        },
        "token-7",
    )
}

/// Record every event published on `bus`.
pub fn record(bus: &SubscriptionBus) -> (raffle_events::Subscription, Arc<Mutex<Vec<SyncEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = bus.add_listener(move |e| sink.lock().unwrap().push(e.clone()));
    (sub, seen)
}

/// Let spawned tasks run to their next await point.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory [`NotificationStore`] standing in for the backend.
///
/// Mutations update the server-side list so later fetches observe them.
#[derive(Default)]
pub struct MockStore {
    server: Mutex<Vec<Notification>>,

    pub list_calls: AtomicUsize,
    pub mark_read_calls: Mutex<Vec<Vec<DbId>>>,
    pub mark_all_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,

    /// List requests fail with a 500.
    pub fail_list: AtomicBool,
    /// Mutations fail with a 500.
    pub fail_mutations: AtomicBool,
    /// Every request answers 401.
    pub unauthorized: AtomicBool,

    /// When set, list requests signal `list_entered` and wait for `release`.
    pub hold_list: AtomicBool,
    pub list_entered: Notify,
    pub release: Notify,
}

impl MockStore {
    pub fn with(items: Vec<Notification>) -> Arc<Self> {
        let store = Self::default();
        *store.server.lock().unwrap() = items;
        Arc::new(store)
    }

    /// Add a notification on the server side, newest first.
    pub fn push(&self, item: Notification) {
        self.server.lock().unwrap().insert(0, item);
    }

    pub fn server_unread(&self) -> u64 {
        count_unread(&self.server.lock().unwrap())
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn server_error() -> StoreError {
        StoreError::Api {
            status: 500,
            body: "internal error".to_string(),
        }
    }

    fn check_auth(&self) -> Result<(), StoreError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(StoreError::Unauthorized);
        }
        Ok(())
    }

    fn check_mutation(&self) -> Result<(), StoreError> {
        self.check_auth()?;
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::server_error());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationStore for MockStore {
    async fn list_notifications(
        &self,
        page_size: u32,
        include_stats: bool,
    ) -> Result<NotificationPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.hold_list.load(Ordering::SeqCst) {
            self.list_entered.notify_one();
            self.release.notified().await;
        }

        self.check_auth()?;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::server_error());
        }

        let server = self.server.lock().unwrap();
        let results: Vec<Notification> = server.iter().take(page_size as usize).cloned().collect();
        let stats = include_stats.then(|| NotificationStats {
            unread_count: count_unread(&server),
        });
        Ok(NotificationPage { results, stats })
    }

    async fn mark_read(&self, ids: &[DbId]) -> Result<(), StoreError> {
        self.mark_read_calls.lock().unwrap().push(ids.to_vec());
        self.check_mutation()?;

        for n in self.server.lock().unwrap().iter_mut() {
            if ids.contains(&n.id) {
                n.is_read = true;
            }
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), StoreError> {
        self.mark_all_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;

        for n in self.server.lock().unwrap().iter_mut() {
            n.is_read = true;
        }
        Ok(())
    }

    async fn delete_notification(&self, id: DbId) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;

        let mut server = self.server.lock().unwrap();
        let index = server
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::Api {
                status: 404,
                body: "not found".to_string(),
            })?;
        server.remove(index);
        Ok(())
    }
}
