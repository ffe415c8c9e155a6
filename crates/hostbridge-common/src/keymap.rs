//! Key-to-code-point mapping.
//!
//! Keyboard subscriptions deliver a single code point to the guest rather
//! than the DOM's string-valued `key`. The mapping is a collaborator of the
//! registry so embedders can substitute their own, but almost everyone wants
//! [`StandardKeyMap`].

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::events::KeyStroke;

/// Maps a normalized keyboard event to the code point delivered to the
/// guest. `None` means the event produces no callback at all.
pub trait KeyCodePointMap {
    fn code_point(&self, stroke: &KeyStroke) -> Option<u32>;
}

/// Named keys that carry a code point despite a multi-character `key` value.
///
/// Editing keys map to their ASCII control codes; arrow keys map to the
/// Unicode arrow glyphs U+2190..U+2193.
static NAMED_KEYS: Lazy<FxHashMap<&'static str, u32>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("Backspace", 8);
    map.insert("Tab", 9);
    map.insert("Enter", 10);
    map.insert("Escape", 27);
    map.insert("Delete", 127);
    map.insert("ArrowLeft", 0x2190);
    map.insert("ArrowUp", 0x2191);
    map.insert("ArrowRight", 0x2192);
    map.insert("ArrowDown", 0x2193);
    map
});

/// The default mapping.
///
/// A single-character `key` resolves to that character's code point. The
/// named keys in [`NAMED_KEYS`] resolve to their table entry. Everything
/// else — pure modifiers ("Shift", "Control"), function keys, dead keys,
/// and any stroke that is part of an IME composition — resolves to `None`.
pub struct StandardKeyMap;

impl KeyCodePointMap for StandardKeyMap {
    fn code_point(&self, stroke: &KeyStroke) -> Option<u32> {
        if stroke.composing {
            return None;
        }
        let mut chars = stroke.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c as u32),
            _ => NAMED_KEYS.get(stroke.key.as_str()).copied(),
        }
    }
}
