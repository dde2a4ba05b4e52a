use std::collections::HashSet;

/// Modifier keys tracked by the overlay.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Modifier {
    Shift,
    Control,
    Option,
    Command,
    CapsLock,
}

impl Modifier {
    /// Canonical lowercase name used in highlight events.
    pub fn name(self) -> &'static str {
        match self {
            Modifier::Shift => "shift",
            Modifier::Control => "control",
            Modifier::Option => "option",
            Modifier::Command => "command",
            Modifier::CapsLock => "capslock",
        }
    }
}

/// Construct a modifier set from macOS CGEventFlags bits.
///
/// Matching bits:
/// - CapsLock (1 << 16) — a level, reported for as long as the lock is on
/// - Shift (1 << 17)
/// - Control (1 << 18)
/// - Option/Alternate (1 << 19)
/// - Command (1 << 20)
///
/// The same bit layout is used by `NSEvent.modifierFlags`, so both event
/// sources decode through this one function.
pub fn modifiers_from_cg_flags(flags: u64) -> HashSet<Modifier> {
    let mut set = HashSet::new();
    if flags & (1 << 16) != 0 {
        set.insert(Modifier::CapsLock);
    }
    if flags & (1 << 17) != 0 {
        set.insert(Modifier::Shift);
    }
    if flags & (1 << 18) != 0 {
        set.insert(Modifier::Control);
    }
    if flags & (1 << 19) != 0 {
        set.insert(Modifier::Option);
    }
    if flags & (1 << 20) != 0 {
        set.insert(Modifier::Command);
    }
    set
}
