//! Permission-free NSEvent monitoring.
//!
//! Installs a local monitor (events delivered to this app) and a global
//! monitor (events in other apps, to the extent the OS shares them without
//! Input Monitoring) for key and flags-changed events, forwarding each as a
//! [`RawEvent`]. The local monitor passes every event through unmodified —
//! this strategy observes, it never swallows.

use std::{ptr::NonNull, sync::Arc};

use block2::StackBlock;
use core_foundation::runloop::CFRunLoop;
use crossbeam_channel::Sender;
use keypane_protocol::{EventKind, RawEvent};
use objc2_app_kit::{NSEvent, NSEventMask, NSEventType};
use tracing::{debug, trace, warn};

use crate::RunLoopControl;

/// Decode one NSEvent and forward it; non-keyboard events are dropped.
fn forward(tx: &Sender<RawEvent>, event: &NSEvent) {
    let kind = match unsafe { event.r#type() } {
        NSEventType::KeyDown => EventKind::KeyDown,
        NSEventType::KeyUp => EventKind::KeyUp,
        NSEventType::FlagsChanged => EventKind::FlagsChanged,
        _ => return,
    };
    let code = unsafe { event.keyCode() };
    let flags = unsafe { event.modifierFlags() }.0 as u64;
    trace!(code, flags, ?kind, "monitor_event");
    let _ = tx.send(RawEvent { code, kind, flags });
}

/// Install the NSEvent monitors and run this thread's run loop until it is
/// stopped via `ctrl`.
///
/// Must be called on the main thread: the monitor handlers are serviced by
/// the installing thread's run loop. Readiness (or a typed error) is
/// reported over `ready` before the loop starts.
pub fn run_monitor_loop(
    tx: Sender<RawEvent>,
    ready: Sender<crate::Result<()>>,
    ctrl: Arc<RunLoopControl>,
) -> crate::Result<()> {
    let mask = NSEventMask::KeyDown | NSEventMask::KeyUp | NSEventMask::FlagsChanged;

    debug!("installing_event_monitors");
    let tx_global = tx.clone();
    let global_block = StackBlock::new(move |event: NonNull<NSEvent>| {
        forward(&tx_global, unsafe { event.as_ref() });
    })
    .copy();
    let global = unsafe { NSEvent::addGlobalMonitorForEventsMatchingMask_handler(mask, &global_block) };

    let tx_local = tx;
    let local_block = StackBlock::new(move |event: NonNull<NSEvent>| -> *mut NSEvent {
        forward(&tx_local, unsafe { event.as_ref() });
        // Pass the event through unchanged so the focused app still sees it.
        event.as_ptr()
    })
    .copy();
    let local = unsafe { NSEvent::addLocalMonitorForEventsMatchingMask_handler(mask, &local_block) };

    if global.is_none() && local.is_none() {
        warn!("event_monitor_install_failed");
        let _ = ready.send(Err(crate::Error::MonitorStart));
        return Err(crate::Error::MonitorStart);
    }
    if global.is_none() {
        // Still usable: local-only means events while the app is active.
        warn!("global_monitor_unavailable_local_only");
    }

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl);

    let _ = ready.send(Ok(()));
    debug!("event_monitors_started_run_loop");

    CFRunLoop::run_current();

    unsafe {
        if let Some(m) = global {
            NSEvent::removeMonitor(&m);
        }
        if let Some(m) = local {
            NSEvent::removeMonitor(&m);
        }
    }
    debug!("event_monitors_exited");
    Ok(())
}
