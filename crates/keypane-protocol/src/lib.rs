//! Shared event types crossing KeyPane crate boundaries.
//!
//! - [`RawEvent`]: what the event sources deliver to the engine.
//! - [`UiEvent`]: what the engine emits to the rendering collaborator.
//! - [`DisplayMode`]: the discrete overlay mode derived from held modifiers.

use std::collections::HashSet;

use keycode::{Keycode, Modifier};
use serde::{Deserialize, Serialize};

/// Kind of a raw input transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A non-modifier key went down.
    KeyDown,
    /// A non-modifier key went up.
    KeyUp,
    /// The modifier flags mask changed.
    FlagsChanged,
}

/// One raw input observation from an event source.
///
/// Transient: translated to a semantic key name before anything leaves the
/// engine. `flags` carries the full CGEventFlags/NSEvent mask so the engine
/// can diff held modifiers on every observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Hardware virtual keycode.
    pub code: Keycode,
    /// Transition kind.
    pub kind: EventKind,
    /// Active modifier flags bitmask at the time of the event.
    pub flags: u64,
}

/// Discrete overlay rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    /// No option-layer characters shown.
    #[default]
    Normal,
    /// Option held alone.
    Option,
    /// Option held together with shift or caps-lock.
    OptionShift,
}

impl DisplayMode {
    /// Derive the mode from the currently-held modifier set.
    ///
    /// Caps-lock counts as shift for the option layer, matching how the
    /// keyboard itself composes option characters.
    pub fn derive(held: &HashSet<Modifier>) -> Self {
        if held.contains(&Modifier::Option) {
            if held.contains(&Modifier::Shift) || held.contains(&Modifier::CapsLock) {
                Self::OptionShift
            } else {
                Self::Option
            }
        } else {
            Self::Normal
        }
    }
}

/// Outbound events consumed by the rendering and menu collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    /// Show the overlay panel.
    ShowPanel,
    /// Hide the overlay panel.
    HidePanel,
    /// A key became active (pressed or newly-held modifier).
    KeyHighlightOn(String),
    /// A key became inactive.
    KeyHighlightOff(String),
    /// The derived display mode changed.
    ModeChanged(DisplayMode),
}
