//! Simple, macOS-only permission checks for KeyPane.
//!
//! The privileged event-tap strategy needs Input Monitoring (and benefits
//! from Accessibility); the NSEvent-monitor strategy needs neither. This
//! crate only queries — there is no prompting logic here. The host decides
//! how to guide the user to System Settings, or whether to degrade to the
//! permission-free strategy.
//!
//! All calls are fast and side-effect free.

use serde::Serialize;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGPreflightListenEventAccess() -> bool;
}

/// Check if the process has the global Accessibility permission.
pub fn accessibility_ok() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Check if the application has the "Input Monitoring" permission.
///
/// Returns `true` when the process is allowed to listen for keyboard events
/// through a CGEvent tap, and `false` otherwise.
pub fn input_monitoring_ok() -> bool {
    unsafe { CGPreflightListenEventAccess() }
}

/// Current permission status for the process.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionsStatus {
    /// Accessibility (AX) permission; `true` if granted.
    pub accessibility_ok: bool,
    /// Input Monitoring permission; `true` if granted.
    pub input_ok: bool,
}

impl PermissionsStatus {
    /// True when the privileged event-tap strategy can run.
    pub fn tap_available(self) -> bool {
        self.input_ok
    }
}

/// Query both Accessibility and Input Monitoring permissions.
///
/// This is a convenience wrapper over [`accessibility_ok`] and
/// [`input_monitoring_ok`]. The function performs no prompting and has no
/// side effects.
pub fn check_permissions() -> PermissionsStatus {
    PermissionsStatus {
        accessibility_ok: accessibility_ok(),
        input_ok: input_monitoring_ok(),
    }
}
