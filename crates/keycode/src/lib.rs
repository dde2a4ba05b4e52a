//! keycode: Key identities for the KeyPane overlay.
//!
//! - `Keymap`: translates raw macOS virtual keycodes to lowercase semantic
//!   key names from a layout table, with a `key(<code>)` fallback.
//! - `Modifier`: the small modifier set the overlay tracks, with conversion
//!   from CGEventFlags bits.
//!
//! A "keycode" here is the macOS hardware virtual keycode: the integer
//! reported by `NSEvent.keyCode` and by CoreGraphics in the
//! `kCGKeyboardEventKeycode` field (the `kVK_*` constants). It identifies a
//! physical key position, not a character.

mod keymap;
pub use keymap::Keymap;

mod modifiers;
pub use modifiers::{Modifier, modifiers_from_cg_flags};

/// macOS hardware virtual keycode (`kVK_*`, `NSEvent.keyCode`).
pub type Keycode = u16;

/// Keycode of the Escape key (`kVK_Escape`).
pub const ESCAPE: Keycode = 53;
