//! gesture: classifies trigger-modifier press patterns.
//!
//! The recognizer consumes a time-ordered sequence of press/release
//! transitions on one designated trigger modifier and classifies each press
//! as a double-tap toggle or a candidate hold. It is a pure state machine:
//! timer arming and cancellation are performed by the caller from the
//! returned decisions, so the classification logic stays independent of the
//! event source and of any runtime.

mod recognizer;
pub use recognizer::{DOUBLE_TAP_WINDOW, HOLD_THRESHOLD, PressDecision, Recognizer, ReleaseDecision};
