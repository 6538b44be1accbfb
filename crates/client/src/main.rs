//! `raffle-notify` -- headless notification sync client.
//!
//! Keeps a user's raffle notifications in sync with the backend, logs
//! every change, and optionally counts down to a draw.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default | Description                                 |
//! |------------------------|----------|---------|---------------------------------------------|
//! | `API_URL`              | yes      | --      | REST base URL, e.g. `http://host:8000/api`  |
//! | `API_TOKEN`            | no       | --      | Bearer token for the session                |
//! | `SESSION_USER_ID`      | yes      | --      | Integer ID of the session user              |
//! | `SESSION_USERNAME`     | no       | --      | Display name of the session user            |
//! | `PUSH_WS_URL`          | no       | --      | WebSocket push endpoint                     |
//! | `POLL_INTERVAL_SECS`   | no       | `30`    | Seconds between polls                       |
//! | `PAGE_SIZE`            | no       | `20`    | Notifications fetched per sync              |
//! | `RECONCILE_DELAY_MS`   | no       | `450`   | Delay before re-fetching after a read       |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`    | HTTP request timeout                        |
//! | `DRAW_AT`              | no       | --      | RFC 3339 draw instant to count down to      |

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use raffle_client::api::HttpNotificationStore;
use raffle_client::config::ClientConfig;
use raffle_client::push::{self, ReconnectConfig};
use raffle_client::sync::NotificationSyncEngine;
use raffle_client::ticker::{self, CountdownTicker};
use raffle_core::countdown::{CountdownClock, CountdownTarget, Phase};
use raffle_events::{SubscriptionBus, SyncEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for the push listener to wind down on exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raffle_client=info,raffle_events=info,raffle_notify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let session = config.session();
    if !session.is_authenticated() {
        tracing::error!("SESSION_USER_ID environment variable is required");
        std::process::exit(1);
    }

    let store = HttpNotificationStore::new(&config.api_url, &session, config.request_timeout())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        });

    tracing::info!(
        api_url = %store.api_url(),
        user_id = session.user_id(),
        push = config.push_ws_url.is_some(),
        "Starting raffle-notify",
    );

    let bus = Arc::new(SubscriptionBus::new());
    let engine = NotificationSyncEngine::new(Arc::new(store), Arc::clone(&bus), config.sync_config());

    // Session expiry is reported on the bus; forward it to the main loop.
    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();
    let _log_subscription = bus.add_listener(move |event| match event {
        SyncEvent::NotificationsUpdated { notifications, stats } => {
            tracing::info!(
                count = notifications.as_ref().map(Vec::len),
                unread = stats.map(|s| s.unread_count),
                "Notifications updated",
            );
        }
        SyncEvent::SessionExpired => {
            let _ = expired_tx.send(());
        }
        SyncEvent::PollFailed { message } => {
            tracing::warn!(error = %message, "Notification poll failed");
        }
        SyncEvent::Other { name, .. } => {
            tracing::debug!(event = %name, "Unhandled event");
        }
    });

    engine.start(&session).await;
    let snapshot = engine.snapshot();
    tracing::info!(
        count = snapshot.notifications.len(),
        unread = snapshot.unread_count,
        error = snapshot.error.as_deref(),
        "Initial sync complete",
    );

    let push_cancel = CancellationToken::new();
    let push_handle = config.push_ws_url.clone().map(|url| {
        let bus = Arc::clone(&bus);
        let token = session.token.clone();
        let cancel = push_cancel.clone();
        tokio::spawn(async move {
            push::run(&url, token, bus, ReconnectConfig::default(), cancel).await;
        })
    });

    let countdown = config.draw_at.map(|draw_at| {
        let target = CountdownTarget::fixed(draw_at, Phase::WaitingForDraw);
        CountdownTicker::start(target, CountdownClock::new(Utc::now(), None))
    });
    let mut countdown_rx = countdown.as_ref().map(CountdownTicker::subscribe);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            Some(()) = expired_rx.recv() => {
                tracing::warn!("Session expired, exiting");
                break;
            }
            changed = async {
                match countdown_rx.as_mut() {
                    Some(rx) => rx.changed().await,
                    None => std::future::pending().await,
                }
            } => {
                let Some(rx) = countdown_rx.as_mut() else { continue };
                if changed.is_err() {
                    countdown_rx = None;
                    continue;
                }
                let view = rx.borrow_and_update().clone();
                tracing::info!(label = view.label, text = %view.text, "Countdown");
                if ticker::is_terminal(&view) {
                    countdown_rx = None;
                }
            }
        }
    }

    engine.stop();
    push_cancel.cancel();
    if let Some(handle) = push_handle {
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("Push listener did not stop in time");
        }
    }
    drop(countdown);

    tracing::info!("raffle-notify stopped");
}
