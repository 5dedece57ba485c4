//! Input events delivered by the host.
//!
//! Pointer positions are relative to the video element's top-left corner.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => *position,
        }
    }
}

/// A key press, named the way browsers name keys ("Delete", "Enter", "z", " ").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    /// Case-insensitive key name comparison.
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

/// Everything the interaction controller reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyPress),
    /// Characters typed into the focused text entry.
    Text(String),
    /// The text entry lost keyboard focus.
    FocusLost,
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        InputEvent::Pointer(PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        })
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        InputEvent::Pointer(PointerEvent::Move { position: Point::new(x, y) })
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        InputEvent::Pointer(PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        })
    }

    pub fn key(key: impl Into<String>) -> Self {
        InputEvent::Key(KeyPress::new(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matching_ignores_case() {
        let press = KeyPress::new("Z").with_ctrl().with_shift();
        assert!(press.is("z"));
        assert!(press.modifiers.ctrl && press.modifiers.shift);
    }

    #[test]
    fn test_pointer_helpers() {
        let InputEvent::Pointer(event) = InputEvent::pointer_down(3.0, 4.0) else {
            panic!("expected pointer event");
        };
        assert_eq!(event.position(), Point::new(3.0, 4.0));
        assert!(matches!(event, PointerEvent::Down { button: MouseButton::Left, .. }));
    }
}
