//! Integration tests for the WebSocket push listener.
//!
//! A throwaway tungstenite server on a loopback port plays the backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use raffle_client::push::{self, ReconnectConfig};
use raffle_events::{SubscriptionBus, SyncEvent};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Accept one connection, send `frames`, then close.
async fn serve_once(frames: Vec<&'static str>) -> (String, Arc<Mutex<Option<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let auth = Arc::new(Mutex::new(None));
    let seen_auth = Arc::clone(&auth);

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_hdr_async(tcp, |req: &Request, resp: Response| {
            *seen_auth.lock().unwrap() = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok::<_, ErrorResponse>(resp)
        })
        .await
        .unwrap();

        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        let _ = ws.close(None).await;
    });

    (format!("ws://{addr}/ws/notifications"), auth)
}

fn forward(bus: &SubscriptionBus) -> (raffle_events::Subscription, mpsc::UnboundedReceiver<SyncEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = bus.add_listener(move |e| {
        let _ = tx.send(e.clone());
    });
    (sub, rx)
}

// ---------------------------------------------------------------------------
// Test: pushed frames are republished on the bus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn frames_are_published_in_order() {
    let (url, auth) = serve_once(vec![
        r#"{"event":"notifications_updated","payload":{"stats":{"unread_count":5}}}"#,
        "not json",
        r#"{"event":"session_expired"}"#,
    ])
    .await;

    let bus = Arc::new(SubscriptionBus::new());
    let (_sub, mut rx) = forward(&bus);
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let bus = Arc::clone(&bus);
        let cancel = cancel.clone();
        async move {
            push::run(&url, Some("tok".to_string()), bus, ReconnectConfig::default(), cancel).await;
        }
    });

    let first = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    match first {
        SyncEvent::NotificationsUpdated { notifications, stats } => {
            assert!(notifications.is_none());
            assert_eq!(stats.map(|s| s.unread_count), Some(5));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // The malformed frame is dropped, not published.
    let second = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(second, SyncEvent::SessionExpired);

    assert_eq!(auth.lock().unwrap().as_deref(), Some("Bearer tok"));

    cancel.cancel();
    tokio::time::timeout(RECV_TIMEOUT, task).await.unwrap().unwrap();
}

// ---------------------------------------------------------------------------
// Test: the listener stops on cancellation while backing off
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_stops_reconnecting() {
    // Nothing listens here, so every attempt fails.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bus = Arc::new(SubscriptionBus::new());
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            push::run(
                &format!("ws://{addr}/ws"),
                None,
                bus,
                ReconnectConfig::default(),
                cancel,
            )
            .await;
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    tokio::time::timeout(RECV_TIMEOUT, task).await.unwrap().unwrap();
}
