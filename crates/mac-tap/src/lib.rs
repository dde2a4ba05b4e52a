//! mac-tap: raw keyboard event sources for KeyPane.
//!
//! Two mutually exclusive strategies deliver the same [`RawEvent`] stream:
//!
//! - [`Source::spawn_tap`]: a privileged CGEvent session tap seeing every
//!   key code regardless of the focused app. Requires the Input Monitoring
//!   permission; the capture callback does nothing but forward events over a
//!   channel, because a slow tap callback stalls keyboard delivery for the
//!   whole session.
//! - [`run_monitor_loop`]: permission-free NSEvent local+global monitors.
//!   Must run on the main thread (the monitors are serviced by that
//!   thread's run loop); sees only what the OS delivers without Input
//!   Monitoring.
//!
//! The consumer's transition logic is identical under either strategy; only
//! which raw events arrive differs.

use std::{sync::Arc, thread};

use core_foundation::runloop::CFRunLoop;
use crossbeam_channel::Sender;
use keypane_protocol::RawEvent;
use parking_lot::Mutex;
use tracing::debug;

mod error;
mod monitor;
mod sys;

pub use error::{Error, Result};
pub use monitor::run_monitor_loop;

/// Shared control handle to stop a capture run loop from other threads.
#[derive(Default)]
pub struct RunLoopControl {
    rl: Mutex<Option<CFRunLoop>>,
}

impl RunLoopControl {
    /// Create an empty control handle.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_rl(&self, rl: CFRunLoop) {
        let mut g = self.rl.lock();
        *g = Some(rl);
    }

    /// Stop the associated run loop, if it has started.
    pub fn stop(&self) {
        let mut g = self.rl.lock();
        if let Some(rl) = g.take() {
            rl.stop();
        }
    }
}

/// A running privileged event tap on a dedicated capture thread.
pub struct Source {
    ctrl: Arc<RunLoopControl>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Source {
    /// Start the privileged session tap on its own thread.
    ///
    /// Blocks until the tap reports readiness; returns the typed error when
    /// the Input Monitoring permission is missing or the tap cannot be
    /// created, so the caller can degrade to the monitor strategy.
    pub fn spawn_tap(tx: Sender<RawEvent>) -> Result<Self> {
        let ctrl = Arc::new(RunLoopControl::new());
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        let ctrl_thread = ctrl.clone();
        let handle = thread::Builder::new()
            .name("keypane-tap".into())
            .spawn(move || {
                let _ = sys::run_tap_loop(tx, ready_tx, ctrl_thread);
            })
            .map_err(|e| Error::OsError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                ctrl,
                handle: Some(handle),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::EventTapStart),
        }
    }

    /// Stop the capture run loop and join the thread.
    pub fn stop(&mut self) {
        self.ctrl.stop();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
            debug!("tap_thread_joined");
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        self.stop();
    }
}
