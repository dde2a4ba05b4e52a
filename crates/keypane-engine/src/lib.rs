//! KeyPane Engine
//!
//! Coordinates the three core components behind a single serialized context:
//! - the gesture recognizer classifying trigger-modifier press patterns
//! - the held-modifier tracker and display-mode derivation
//! - the Hidden/Visible overlay state machine
//!
//! Raw events arrive from an event source (see the `mac-tap` crate) on a
//! capture thread; [`Engine::handle_raw`] is the only entry point, and every
//! transition it performs happens under one mutex so gesture classification,
//! modifier updates and visibility changes never race. The cancellable hold
//! timer fires back into the same mutex and re-validates that the trigger is
//! still physically held, so a release observed before the fire always wins.
//!
//! [`Engine::handle_raw`] must be called from within a tokio runtime context
//! because arming the hold timer spawns a task.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use gesture::{PressDecision, Recognizer};
use keycode::{Keymap, Modifier, modifiers_from_cg_flags};
use keypane_protocol::{DisplayMode, EventKind, RawEvent, UiEvent};

mod error;
mod hold;
mod state;

pub use error::{Error, Result};
pub use hold::HoldTimer;
pub use state::Overlay;

/// Read-only configuration inputs for the engine, owned by the settings
/// collaborator and injected at construction.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Double-tap toggles visibility instead of arming the hold timer.
    pub toggle_mode: bool,
    /// Suppress auto-hide on non-modifier key press.
    pub keep_panel_open: bool,
    /// The designated trigger modifier.
    pub trigger: Modifier,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            toggle_mode: false,
            keep_panel_open: false,
            trigger: Modifier::Option,
        }
    }
}

/// State guarded by the engine mutex: the single logical home for all
/// gesture, modifier and visibility mutation.
struct Inner {
    recognizer: Recognizer,
    overlay: Overlay,
    trigger_held: bool,
}

/// Drives the overlay from raw input events.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Mutex<Inner>>,
    hold: Arc<HoldTimer>,
    events: UnboundedSender<UiEvent>,
    trigger: Modifier,
}

impl Engine {
    /// Create a new engine.
    ///
    /// - `opts`: settings snapshot (toggle mode, keep-open policy, trigger)
    /// - `keymap`: the loaded code-to-name table
    /// - `event_tx`: channel carrying [`UiEvent`]s to the rendering collaborator
    pub fn new(opts: Options, keymap: Keymap, event_tx: UnboundedSender<UiEvent>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                recognizer: Recognizer::new(opts.toggle_mode),
                overlay: Overlay::new(keymap, opts.keep_panel_open),
                trigger_held: false,
            })),
            hold: Arc::new(HoldTimer::new()),
            events: event_tx,
            trigger: opts.trigger,
        }
    }

    /// Current overlay visibility.
    pub fn visible(&self) -> bool {
        self.inner.lock().overlay.visible()
    }

    /// Current derived display mode.
    pub fn mode(&self) -> DisplayMode {
        self.inner.lock().overlay.mode()
    }

    /// Explicit dismiss (click-outside or any collaborator-initiated hide).
    pub fn dismiss(&self) -> Result<()> {
        let out = self.inner.lock().overlay.hide();
        self.emit(out)
    }

    /// Process one raw input event.
    ///
    /// Never panics on out-of-order timestamps or unknown codes; the only
    /// error is a closed UI channel, which the caller may treat as shutdown.
    pub fn handle_raw(&self, ev: RawEvent) -> Result<()> {
        trace!(code = ev.code, kind = ?ev.kind, flags = ev.flags, "raw_event");
        match ev.kind {
            EventKind::FlagsChanged => self.on_flags_changed(ev.flags),
            EventKind::KeyDown | EventKind::KeyUp => {
                let out = self.inner.lock().overlay.on_key(ev.kind, ev.code);
                self.emit(out)
            }
        }
    }

    /// Apply a flags observation: diff modifiers first, then run the trigger
    /// edge (press or release) through the recognizer, all under one lock.
    fn on_flags_changed(&self, flags: u64) -> Result<()> {
        let new_held = modifiers_from_cg_flags(flags);
        let trigger_now = new_held.contains(&self.trigger);
        let now = Instant::now();

        let out = {
            let mut inner = self.inner.lock();
            let trigger_was = inner.trigger_held;
            inner.trigger_held = trigger_now;

            let mut out = inner.overlay.on_flags(new_held);

            if !trigger_was && trigger_now {
                match inner.recognizer.on_press(now) {
                    PressDecision::Toggle => {
                        debug!("gesture_toggle");
                        out.extend(inner.overlay.toggle());
                    }
                    PressDecision::ArmHold => {
                        debug!("gesture_arm_hold");
                        self.arm_hold(inner.recognizer.hold_threshold());
                    }
                    PressDecision::Ignore => {}
                }
            } else if trigger_was && !trigger_now {
                self.hold.cancel();
                let visible = inner.overlay.visible();
                let decision = inner.recognizer.on_release(visible);
                if decision.request_hide {
                    debug!("gesture_release_hide");
                    out.extend(inner.overlay.hide());
                }
            }
            out
        };
        self.emit(out)
    }

    /// Arm the hold timer. Called with the engine lock held so that arming
    /// is atomic with the press that requested it; the fire closure takes
    /// the same lock and shows only if the trigger is still down.
    fn arm_hold(&self, delay: Duration) {
        let inner = self.inner.clone();
        let tx = self.events.clone();
        self.hold.arm(delay, move || {
            let out = {
                let mut inner = inner.lock();
                if inner.trigger_held {
                    inner.overlay.show()
                } else {
                    trace!("hold_fire_trigger_released");
                    Vec::new()
                }
            };
            for ev in out {
                if tx.send(ev).is_err() {
                    debug!("ui_channel_closed_on_hold_fire");
                    return;
                }
            }
        });
    }

    /// Forward events in order, surfacing a closed channel as an error.
    fn emit(&self, events: Vec<UiEvent>) -> Result<()> {
        for ev in events {
            self.events.send(ev).map_err(|_| Error::ChannelClosed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    use super::*;

    const OPTION: u64 = 1 << 19;
    const SHIFT: u64 = 1 << 17;

    fn engine(toggle_mode: bool, keep_panel_open: bool) -> (Engine, UnboundedReceiver<UiEvent>) {
        let (tx, rx) = unbounded_channel();
        let keymap = Keymap::from_pairs([(0u16, "a".to_string())]);
        let opts = Options {
            toggle_mode,
            keep_panel_open,
            ..Options::default()
        };
        (Engine::new(opts, keymap, tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn flags(e: &Engine, mask: u64) {
        e.handle_raw(RawEvent {
            code: 58, // kVK_Option; the engine keys off the flags mask
            kind: EventKind::FlagsChanged,
            flags: mask,
        })
        .unwrap();
    }

    fn key(e: &Engine, kind: EventKind, code: u16) {
        e.handle_raw(RawEvent {
            code,
            kind,
            flags: 0,
        })
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn tap_then_hold_shows_exactly_once() {
        let (e, mut rx) = engine(false, false);
        // Quick tap primes the window, second press arms the hold.
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        tokio::time::sleep(Duration::from_millis(350)).await;
        let out = drain(&mut rx);
        assert_eq!(out[0], UiEvent::ShowPanel);
        assert!(out.contains(&UiEvent::KeyHighlightOn("option".into())));
        assert!(out.contains(&UiEvent::ModeChanged(DisplayMode::Option)));
        assert!(e.visible());
        // Nothing further fires for the same press.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn first_cold_press_never_shows() {
        let (e, mut rx) = engine(false, false);
        flags(&e, OPTION);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&mut rx).is_empty());
        assert!(!e.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn release_before_threshold_cancels_show() {
        let (e, mut rx) = engine(false, false);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        tokio::time::sleep(Duration::from_millis(100)).await;
        flags(&e, 0);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&mut rx).is_empty());
        assert!(!e.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_release_hides_while_visible() {
        let (e, mut rx) = engine(false, false);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        tokio::time::sleep(Duration::from_millis(350)).await;
        drain(&mut rx);
        flags(&e, 0);
        let out = drain(&mut rx);
        assert!(out.contains(&UiEvent::KeyHighlightOff("option".into())));
        assert_eq!(*out.last().unwrap(), UiEvent::HidePanel);
        assert!(!e.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn key_press_highlights_then_auto_hides() {
        let (e, mut rx) = engine(false, false);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        tokio::time::sleep(Duration::from_millis(350)).await;
        drain(&mut rx);
        key(&e, EventKind::KeyDown, 0);
        let out = drain(&mut rx);
        assert_eq!(
            out,
            vec![UiEvent::KeyHighlightOn("a".into()), UiEvent::HidePanel]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn double_tap_toggles_both_ways() {
        let (e, mut rx) = engine(true, false);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        let out = drain(&mut rx);
        assert_eq!(out[0], UiEvent::ShowPanel);
        assert!(e.visible());
        flags(&e, 0);
        drain(&mut rx);
        flags(&e, OPTION);
        let out = drain(&mut rx);
        assert_eq!(*out.last().unwrap(), UiEvent::HidePanel);
        assert!(!e.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_mode_never_arms_hold() {
        let (e, mut rx) = engine(true, false);
        flags(&e, OPTION);
        flags(&e, 0);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shift_while_visible_changes_mode() {
        let (e, mut rx) = engine(true, false);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        drain(&mut rx);
        flags(&e, OPTION | SHIFT);
        let out = drain(&mut rx);
        assert!(out.contains(&UiEvent::KeyHighlightOn("shift".into())));
        assert!(out.contains(&UiEvent::ModeChanged(DisplayMode::OptionShift)));
        assert_eq!(e.mode(), DisplayMode::OptionShift);
    }

    #[tokio::test(start_paused = true)]
    async fn escape_forces_hide_despite_keep_open() {
        let (e, mut rx) = engine(true, true);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        drain(&mut rx);
        key(&e, EventKind::KeyDown, keycode::ESCAPE);
        assert_eq!(drain(&mut rx), vec![UiEvent::HidePanel]);
        assert!(!e.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_hides_and_is_idempotent() {
        let (e, mut rx) = engine(true, false);
        flags(&e, OPTION);
        flags(&e, 0);
        flags(&e, OPTION);
        drain(&mut rx);
        e.dismiss().unwrap();
        assert_eq!(drain(&mut rx), vec![UiEvent::HidePanel]);
        e.dismiss().unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_reports_error_without_panic() {
        let (e, rx) = engine(true, false);
        drop(rx);
        flags(&e, OPTION);
        flags(&e, 0);
        let err = e.handle_raw(RawEvent {
            code: 58,
            kind: EventKind::FlagsChanged,
            flags: OPTION,
        });
        assert!(matches!(err, Err(Error::ChannelClosed)));
    }
}
