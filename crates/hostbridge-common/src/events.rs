//! UI event kinds and their normalized payloads.
//!
//! Host backends translate raw DOM events into these payloads before they
//! reach the registry, so the registry core never touches a DOM type.

/// The UI event kinds a guest can subscribe to.
///
/// `dom_name()` returns the exact DOM event name the host backend listens
/// for; the enum name is the Rust-side spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UiEventKind {
    KeyUp,
    KeyDown,
    MouseMove,
    MouseDown,
    MouseUp,
    Click,
    DoubleClick,
    Wheel,
}

/// Grouping of event kinds by the payload they carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventFamily {
    Keyboard,
    Mouse,
    Wheel,
}

impl UiEventKind {
    /// The DOM event name passed to `addEventListener`.
    pub fn dom_name(self) -> &'static str {
        match self {
            UiEventKind::KeyUp => "keyup",
            UiEventKind::KeyDown => "keydown",
            UiEventKind::MouseMove => "mousemove",
            UiEventKind::MouseDown => "mousedown",
            UiEventKind::MouseUp => "mouseup",
            UiEventKind::Click => "click",
            UiEventKind::DoubleClick => "dblclick",
            UiEventKind::Wheel => "wheel",
        }
    }

    /// Which payload family events of this kind carry.
    pub fn family(self) -> EventFamily {
        match self {
            UiEventKind::KeyUp | UiEventKind::KeyDown => EventFamily::Keyboard,
            UiEventKind::MouseMove
            | UiEventKind::MouseDown
            | UiEventKind::MouseUp
            | UiEventKind::Click
            | UiEventKind::DoubleClick => EventFamily::Mouse,
            UiEventKind::Wheel => EventFamily::Wheel,
        }
    }
}

/// A normalized keyboard event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyStroke {
    /// The DOM `key` value ("a", "Enter", "Shift", ...).
    pub key: String,
    /// True while the event is part of an IME composition session.
    pub composing: bool,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>) -> Self {
        KeyStroke {
            key: key.into(),
            composing: false,
        }
    }
}

/// A normalized mouse event in page coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseReport {
    pub page_x: f64,
    pub page_y: f64,
    /// The DOM `button` value (0 = primary).
    pub button: i16,
}

/// A normalized wheel event. Deltas and mode pass through untranslated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelReport {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_z: f64,
    /// The DOM `deltaMode` enumerant (0 = pixel, 1 = line, 2 = page).
    pub delta_mode: u32,
}

/// A normalized event as delivered by a host backend.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEventPayload {
    Key(KeyStroke),
    Mouse(MouseReport),
    Wheel(WheelReport),
}

impl UiEventPayload {
    pub fn family(&self) -> EventFamily {
        match self {
            UiEventPayload::Key(_) => EventFamily::Keyboard,
            UiEventPayload::Mouse(_) => EventFamily::Mouse,
            UiEventPayload::Wheel(_) => EventFamily::Wheel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_names_match_the_dom() {
        assert_eq!(UiEventKind::KeyUp.dom_name(), "keyup");
        assert_eq!(UiEventKind::DoubleClick.dom_name(), "dblclick");
        assert_eq!(UiEventKind::Wheel.dom_name(), "wheel");
    }

    #[test]
    fn test_kind_family_grouping() {
        assert_eq!(UiEventKind::KeyDown.family(), EventFamily::Keyboard);
        assert_eq!(UiEventKind::Click.family(), EventFamily::Mouse);
        assert_eq!(UiEventKind::Wheel.family(), EventFamily::Wheel);
    }

    #[test]
    fn test_payload_family_matches_kind_family() {
        let key = UiEventPayload::Key(KeyStroke::new("a"));
        assert_eq!(key.family(), EventFamily::Keyboard);
    }
}
