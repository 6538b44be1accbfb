//! Live countdown ticker.
//!
//! Drives a [`CountdownTarget`] off a skew-corrected [`CountdownClock`],
//! publishing a fresh [`CountdownView`] every second through a
//! [`tokio::sync::watch`] channel. The ticker stops by itself once the view
//! is terminal (expired, or nothing to count down to), so an expired
//! countdown never keeps a timer alive.

use std::time::Duration;

use raffle_core::countdown::{CountdownClock, CountdownTarget, CountdownView, Urgency, TICK_MILLIS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(TICK_MILLIS as u64);

/// A view needs no further ticks once it has expired or has no target.
pub fn is_terminal(view: &CountdownView) -> bool {
    matches!(view.urgency, None | Some(Urgency::Expired))
}

/// Handle to a running countdown.
///
/// Dropping the handle stops the timer.
pub struct CountdownTicker {
    view: watch::Receiver<CountdownView>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    /// Evaluate `target` immediately and then once per tick.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(target: CountdownTarget, mut clock: CountdownClock) -> Self {
        let initial = target.evaluate(clock.now());
        let done = is_terminal(&initial);
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            if done {
                return;
            }

            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let view = target.evaluate(clock.tick());
                let finished = is_terminal(&view);
                if tx.send(view).is_err() {
                    break;
                }
                if finished {
                    tracing::debug!("Countdown reached its target");
                    break;
                }
            }
        });

        Self {
            view: rx,
            cancel,
            handle,
        }
    }

    /// The most recent view.
    pub fn view(&self) -> CountdownView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every published view.
    pub fn subscribe(&self) -> watch::Receiver<CountdownView> {
        self.view.clone()
    }

    /// Whether the timer has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop ticking and return the last view.
    pub fn stop(self) -> CountdownView {
        self.view()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
