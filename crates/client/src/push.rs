//! WebSocket push listener.
//!
//! Connects to the backend push endpoint and republishes every text frame
//! on the [`SubscriptionBus`] as a [`SyncEvent`]. Frames are JSON objects
//! of the form `{"event": "<name>", "payload": {...}}`.
//!
//! Dropped connections are retried with exponential backoff until the
//! [`CancellationToken`] is triggered.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use raffle_events::{EventError, SubscriptionBus, SyncEvent};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Push connection failed: {0}")]
    Connection(String),

    #[error("Malformed push frame: {0}")]
    Frame(#[from] serde_json::Error),

    #[error(transparent)]
    Event(#[from] EventError),
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PushFrame {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decode one text frame into a bus event.
pub fn parse_frame(text: &str) -> Result<SyncEvent, PushError> {
    let frame: PushFrame = serde_json::from_str(text)?;
    Ok(SyncEvent::from_parts(&frame.event, frame.payload)?)
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Reconnect backoff for the push listener.
///
/// Each failed or empty session doubles the wait (by default) up to
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Wait after the first failure.
    pub initial_delay: Duration,
    /// Cap on the wait between attempts.
    pub max_delay: Duration,
    /// Growth factor applied after each failure.
    pub factor: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl ReconnectConfig {
    /// Wait that follows `current`, never above `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(self.factor).min(self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

type PushStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Run the push listener until `cancel` fires.
///
/// The backoff delay resets after every session that delivered at least
/// one frame.
pub async fn run(
    url: &str,
    token: Option<String>,
    bus: Arc<SubscriptionBus>,
    config: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(url = %url, attempt, "Connecting to push endpoint");

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect(url, token.as_deref()) => result,
        };

        match connected {
            Ok(stream) => {
                tracing::info!("Push connection established");
                let delivered = run_session(stream, &bus, &cancel).await;
                if cancel.is_cancelled() {
                    break;
                }
                if delivered > 0 {
                    delay = config.initial_delay;
                    attempt = 0;
                }
                tracing::warn!(delivered, "Push session ended, reconnecting");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Push attempt {attempt} failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = config.next_delay(delay);
    }

    tracing::info!("Push listener stopped");
}

async fn connect(url: &str, token: Option<&str>) -> Result<PushStream, PushError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| PushError::Connection(e.to_string()))?;

    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| PushError::Connection(e.to_string()))?;
        request.headers_mut().insert("Authorization", value);
    }

    let (stream, _response) = connect_async(request)
        .await
        .map_err(|e| PushError::Connection(format!("Failed to connect to {url}: {e}")))?;
    Ok(stream)
}

/// Read frames until the connection ends or `cancel` fires. Returns the
/// number of events published.
async fn run_session(
    stream: PushStream,
    bus: &SubscriptionBus,
    cancel: &CancellationToken,
) -> usize {
    let (_sink, mut stream) = stream.split();
    let mut delivered = 0;

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = stream.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(event) => {
                    tracing::debug!(event = event.name(), "Push event received");
                    bus.publish(event);
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping push frame");
                }
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Push endpoint closed the connection");
                break;
            }
            Some(Ok(_)) => {
                // Ping/pong are answered by tungstenite; binary is unused.
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Push receive error");
                break;
            }
            None => break,
        }
    }

    delivered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
