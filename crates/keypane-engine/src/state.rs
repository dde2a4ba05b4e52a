use std::collections::HashSet;

use keycode::{ESCAPE, Keycode, Keymap, Modifier};
use keypane_protocol::{DisplayMode, EventKind, UiEvent};

/// The visibility state machine plus the tracked held-modifier set.
///
/// Pure: every method returns the outbound events the transition produced,
/// in order, and performs no I/O. The engine serializes all calls and
/// forwards the returned events to the rendering collaborator.
#[derive(Debug)]
pub struct Overlay {
    keymap: Keymap,
    keep_open: bool,
    visible: bool,
    held: HashSet<Modifier>,
    mode: DisplayMode,
}

impl Overlay {
    /// Create a hidden overlay with an empty held set.
    pub fn new(keymap: Keymap, keep_open: bool) -> Self {
        Self {
            keymap,
            keep_open,
            visible: false,
            held: HashSet::new(),
            mode: DisplayMode::Normal,
        }
    }

    /// Current visibility.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Current derived display mode.
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Transition Hidden -> Visible.
    ///
    /// Emits `ShowPanel`, a highlight for every modifier already held at the
    /// moment of transition, and the derived `ModeChanged`. A show request
    /// while already visible is a no-op.
    pub fn show(&mut self) -> Vec<UiEvent> {
        if self.visible {
            return Vec::new();
        }
        self.visible = true;
        let mut out = vec![UiEvent::ShowPanel];
        for m in &self.held {
            out.push(UiEvent::KeyHighlightOn(m.name().to_string()));
        }
        self.mode = DisplayMode::derive(&self.held);
        out.push(UiEvent::ModeChanged(self.mode));
        out
    }

    /// Transition Visible -> Hidden: clear the held set and reset the mode.
    /// A hide request while already hidden is a no-op.
    pub fn hide(&mut self) -> Vec<UiEvent> {
        if !self.visible {
            return Vec::new();
        }
        self.visible = false;
        self.held.clear();
        self.mode = DisplayMode::Normal;
        vec![UiEvent::HidePanel]
    }

    /// Flip visibility (double-tap toggle gesture).
    pub fn toggle(&mut self) -> Vec<UiEvent> {
        if self.visible { self.hide() } else { self.show() }
    }

    /// Apply a modifier flags observation.
    ///
    /// The held set always tracks the most recent observation, even while
    /// hidden (so a later show can snapshot modifiers that were already
    /// down). Highlight and mode events are emitted only while visible, and
    /// only for the diff against the previous set: repeating an identical
    /// set produces nothing.
    pub fn on_flags(&mut self, new_held: HashSet<Modifier>) -> Vec<UiEvent> {
        if !self.visible {
            self.held = new_held;
            return Vec::new();
        }

        let mut out = Vec::new();
        for m in new_held.difference(&self.held) {
            out.push(UiEvent::KeyHighlightOn(m.name().to_string()));
        }
        for m in self.held.difference(&new_held) {
            out.push(UiEvent::KeyHighlightOff(m.name().to_string()));
        }
        self.held = new_held;

        let mode = DisplayMode::derive(&self.held);
        if mode != self.mode {
            self.mode = mode;
            out.push(UiEvent::ModeChanged(mode));
        }
        out
    }

    /// Apply a non-modifier key transition.
    ///
    /// Ignored while hidden. Escape on key-down forces a hide regardless of
    /// the keep-open policy. Any other key-down emits its highlight and then
    /// hides the overlay unless keep-open is in effect; key-up only clears
    /// the highlight.
    pub fn on_key(&mut self, kind: EventKind, code: Keycode) -> Vec<UiEvent> {
        if !self.visible {
            return Vec::new();
        }
        if kind == EventKind::KeyDown && code == ESCAPE {
            return self.hide();
        }

        let name = self.keymap.name(code);
        match kind {
            EventKind::KeyDown => {
                let mut out = vec![UiEvent::KeyHighlightOn(name)];
                if !self.keep_open {
                    out.extend(self.hide());
                }
                out
            }
            EventKind::KeyUp => vec![UiEvent::KeyHighlightOff(name)],
            EventKind::FlagsChanged => Vec::new(),
        }
    }
}
