//! macOS event tap (CoreGraphics) integration.
//!
//! The tap never suppresses anything: every event is forwarded as a
//! [`RawEvent`] and returned to the OS with `CallbackResult::Keep`. The
//! callback body is a channel send and nothing else — it runs on the session
//! event path, and any real work it did would stall keyboard delivery
//! system-wide.

use std::{
    ffi::c_void,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};

use core_foundation::{
    base::TCFType,
    mach_port::CFMachPortRef,
    runloop::{CFRunLoop, kCFRunLoopCommonModes},
};
use core_graphics::event::{self as cge, CallbackResult};
use crossbeam_channel::Sender;
use keypane_protocol::{EventKind, RawEvent};
use tracing::{debug, trace, warn};

use crate::RunLoopControl;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

// Minimal subset of CGEventField constants used by this module.
const FIELD_KEYBOARD_EVENT_KEYCODE: u32 = 9;

/// Run the session event tap on the current thread until the run loop is
/// stopped via `ctrl`.
pub(crate) fn run_tap_loop(
    tx: Sender<RawEvent>,
    ready: Sender<crate::Result<()>>,
    ctrl: Arc<RunLoopControl>,
) -> crate::Result<()> {
    // Preflight Input Monitoring permission.
    if !permissions::input_monitoring_ok() {
        warn!("input_monitoring_permission_missing");
        let _ = ready.send(Err(crate::Error::PermissionDenied("Input Monitoring")));
        return Err(crate::Error::PermissionDenied("Input Monitoring"));
    }

    // Capture for re-enabling the tap from inside the closure.
    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(std::ptr::null_mut()));

    debug!("creating_event_tap");
    let tap_port_ptr_cb = tap_port_ptr.clone();
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::Session,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::ListenOnly,
        vec![
            cge::CGEventType::KeyDown,
            cge::CGEventType::KeyUp,
            cge::CGEventType::FlagsChanged,
        ],
        move |_proxy, etype, event| {
            match etype {
                cge::CGEventType::KeyDown
                | cge::CGEventType::KeyUp
                | cge::CGEventType::FlagsChanged => {
                    let code = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u16;
                    let flags = event.get_flags().bits();
                    let kind = match etype {
                        cge::CGEventType::KeyDown => EventKind::KeyDown,
                        cge::CGEventType::KeyUp => EventKind::KeyUp,
                        _ => EventKind::FlagsChanged,
                    };
                    trace!(code, flags, ?kind, "tap_event");
                    let _ = tx.send(RawEvent { code, kind, flags });
                    CallbackResult::Keep
                }
                cge::CGEventType::TapDisabledByTimeout
                | cge::CGEventType::TapDisabledByUserInput => {
                    let p = tap_port_ptr_cb.load(Ordering::SeqCst) as CFMachPortRef;
                    if !p.is_null() {
                        warn!("tap_disabled_by_os_reenabling");
                        unsafe { CGEventTapEnable(p, true) };
                    }
                    CallbackResult::Keep
                }
                _ => CallbackResult::Keep,
            }
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("event_tap_create_failed");
            let _ = ready.send(Err(crate::Error::EventTapStart));
            return Err(crate::Error::EventTapStart);
        }
    };

    // Share the CFMachPort for re-enabling inside the callback.
    tap_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::SeqCst,
    );

    // Create a runloop source and start the tap on this thread's runloop.
    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(s) => s,
        Err(_) => {
            warn!("run_loop_source_create_failed");
            let _ = ready.send(Err(crate::Error::EventTapStart));
            return Err(crate::Error::EventTapStart);
        }
    };

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl.clone());
    let mode = unsafe { kCFRunLoopCommonModes };
    rl.add_source(&source, mode);

    // Enable the tap and run the loop.
    tap.enable();

    let _ = ready.send(Ok(()));
    debug!("event_tap_started_run_loop");

    CFRunLoop::run_current();

    debug!("event_tap_exited");
    Ok(())
}
