//! Single-outstanding cancellable hold timer.
//!
//! Arms a closure to run after a delay; arming replaces (and cancels) any
//! prior armed action for the same timer, and a release-time cancel issued
//! strictly before the fire begins always wins. The fire closure runs inside
//! the engine's serialized context, which re-validates physical state.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

struct HoldEntry {
    token: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// At most one armed delayed action at a time.
#[derive(Default)]
pub struct HoldTimer {
    entry: Mutex<Option<HoldEntry>>,
}

impl HoldTimer {
    /// Create an unarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `on_fire` to run after `delay`, atomically replacing any prior
    /// armed action.
    pub fn arm<F>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    trace!("hold_timer_cancelled");
                }
                _ = time::sleep(delay) => {
                    trace!("hold_timer_fire");
                    on_fire();
                }
            }
        });

        let mut guard = self.entry.lock();
        if let Some(prev) = guard.replace(HoldEntry { token, handle }) {
            prev.token.cancel();
            trace!("hold_timer_replaced");
        }
    }

    /// Cancel the armed action, if any. A fire that has already begun
    /// executing is not interrupted; the engine resolves that race by
    /// re-checking trigger state under its own lock.
    pub fn cancel(&self) {
        if let Some(entry) = self.entry.lock().take() {
            entry.token.cancel();
            // Let the task drain via the token rather than aborting it.
            drop(entry.handle);
            trace!("hold_timer_cancel");
        }
    }

    /// True while an action is armed (or its task has not yet drained).
    pub fn is_armed(&self) -> bool {
        self.entry.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let timer = HoldTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timer.arm(Duration::from_millis(300), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_deadline_suppresses_fire() {
        let timer = HoldTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timer.arm(Duration::from_millis(300), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        time::sleep(Duration::from_millis(100)).await;
        timer.cancel();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_prior_action() {
        let timer = HoldTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let f = fired.clone();
            timer.arm(Duration::from_millis(300), move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_millis(100)).await;
        }
        time::sleep(Duration::from_millis(400)).await;
        // Only the last armed action fires.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
