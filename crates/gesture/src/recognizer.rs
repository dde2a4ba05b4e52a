use std::time::{Duration, Instant};

use tracing::trace;

/// Maximum interval between two trigger presses classified as a double-tap.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(400);

/// Minimum continuous press duration before a non-toggle show fires.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(300);

/// What a trigger press asks the caller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressDecision {
    /// Double-tap in toggle configuration: flip visibility immediately.
    Toggle,
    /// Double-tap in hold configuration: arm the hold timer, replacing any
    /// previously armed one. If the trigger is still held when the timer
    /// fires, the overlay is shown.
    ArmHold,
    /// First tap or a press outside the window: nothing to do yet.
    Ignore,
}

/// What a trigger release asks the caller to do. Any armed hold timer is
/// always cancelled on release, independent of this decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseDecision {
    /// Hide the overlay (hold configuration only, and only when visible).
    pub request_hide: bool,
}

/// Classifies press patterns on the trigger modifier.
///
/// Holds only the last-press anchor; created once and reset (not destroyed)
/// on each new press. The anchor is updated on *every* press, including the
/// one that produced a toggle, so a third rapid tap registers as another
/// double-tap.
#[derive(Debug)]
pub struct Recognizer {
    toggle_mode: bool,
    double_tap_window: Duration,
    hold_threshold: Duration,
    last_press: Option<Instant>,
}

impl Recognizer {
    /// Create a recognizer with the default timing constants.
    pub fn new(toggle_mode: bool) -> Self {
        Self::with_timings(toggle_mode, DOUBLE_TAP_WINDOW, HOLD_THRESHOLD)
    }

    /// Create a recognizer with explicit timings (tests and tools).
    pub fn with_timings(
        toggle_mode: bool,
        double_tap_window: Duration,
        hold_threshold: Duration,
    ) -> Self {
        Self {
            toggle_mode,
            double_tap_window,
            hold_threshold,
            last_press: None,
        }
    }

    /// The hold-timer deadline offset for `ArmHold` decisions.
    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    /// Classify a trigger press observed at `now`.
    ///
    /// A missing previous press is an infinite delta; a non-monotonic `now`
    /// saturates to a zero delta rather than panicking, which still counts
    /// as inside the window.
    pub fn on_press(&mut self, now: Instant) -> PressDecision {
        let delta = self.last_press.map(|prev| now.saturating_duration_since(prev));
        self.last_press = Some(now);

        let decision = match delta {
            Some(d) if d < self.double_tap_window => {
                if self.toggle_mode {
                    PressDecision::Toggle
                } else {
                    PressDecision::ArmHold
                }
            }
            _ => PressDecision::Ignore,
        };
        trace!(?delta, ?decision, "trigger_press");
        decision
    }

    /// Classify a trigger release. `visible` is the controller's current
    /// visibility at the moment of release.
    pub fn on_release(&mut self, visible: bool) -> ReleaseDecision {
        let request_hide = !self.toggle_mode && visible;
        trace!(visible, request_hide, "trigger_release");
        ReleaseDecision { request_hide }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn first_press_is_ignored() {
        let mut r = Recognizer::new(true);
        assert_eq!(r.on_press(Instant::now()), PressDecision::Ignore);
    }

    #[test]
    fn double_tap_toggles_in_toggle_mode() {
        let base = Instant::now();
        let mut r = Recognizer::new(true);
        assert_eq!(r.on_press(at(base, 0)), PressDecision::Ignore);
        assert_eq!(r.on_press(at(base, 200)), PressDecision::Toggle);
    }

    #[test]
    fn double_tap_arms_hold_in_hold_mode() {
        let base = Instant::now();
        let mut r = Recognizer::new(false);
        assert_eq!(r.on_press(at(base, 0)), PressDecision::Ignore);
        assert_eq!(r.on_press(at(base, 200)), PressDecision::ArmHold);
    }

    #[test]
    fn slow_second_tap_is_ignored() {
        let base = Instant::now();
        let mut r = Recognizer::new(true);
        assert_eq!(r.on_press(at(base, 0)), PressDecision::Ignore);
        assert_eq!(r.on_press(at(base, 450)), PressDecision::Ignore);
    }

    #[test]
    fn every_qualifying_pair_toggles_once() {
        let base = Instant::now();
        let mut r = Recognizer::new(true);
        let mut toggles = 0;
        for i in 0..6 {
            if r.on_press(at(base, i * 200)) == PressDecision::Toggle {
                toggles += 1;
            }
        }
        // Anchor resets on every press, so each press after the first
        // qualifies while the cadence stays inside the window.
        assert_eq!(toggles, 5);
    }

    #[test]
    fn anchor_resets_on_the_toggling_press() {
        let base = Instant::now();
        let mut r = Recognizer::new(true);
        assert_eq!(r.on_press(at(base, 0)), PressDecision::Ignore);
        assert_eq!(r.on_press(at(base, 200)), PressDecision::Toggle);
        // Third rapid tap measures against the second press, not the first.
        assert_eq!(r.on_press(at(base, 390)), PressDecision::Toggle);
    }

    #[test]
    fn non_monotonic_press_saturates_to_zero_delta() {
        let base = Instant::now() + Duration::from_secs(10);
        let mut r = Recognizer::new(true);
        assert_eq!(r.on_press(base), PressDecision::Ignore);
        // Earlier timestamp than the anchor; must not panic and counts as
        // a zero delta inside the window.
        assert_eq!(
            r.on_press(base - Duration::from_millis(50)),
            PressDecision::Toggle
        );
    }

    #[test]
    fn release_hides_only_when_visible_in_hold_mode() {
        let mut r = Recognizer::new(false);
        assert!(r.on_release(true).request_hide);
        assert!(!r.on_release(false).request_hide);
    }

    #[test]
    fn release_never_hides_in_toggle_mode() {
        let mut r = Recognizer::new(true);
        assert!(!r.on_release(true).request_hide);
        assert!(!r.on_release(false).request_hide);
    }
}
