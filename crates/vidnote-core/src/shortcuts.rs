//! Keyboard shortcut registry.

use crate::input::KeyPress;

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Undo,
    Redo,
    DeleteSelected,
    TogglePlayback,
    SeekBackward,
    SeekForward,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub command: Command,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        command: Command,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            command,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(if self.key == " " { "Space" } else { self.key });
        parts.join("+")
    }

    /// Whether `press` triggers this shortcut.
    ///
    /// Ctrl chords must match Shift exactly; plain keys ignore Shift.
    pub fn matches(&self, press: &KeyPress) -> bool {
        press.is(self.key)
            && press.modifiers.ctrl == self.ctrl
            && (!self.ctrl || press.modifiers.shift == self.shift)
    }
}

static SHORTCUTS: [Shortcut; 8] = [
    Shortcut::new("Z", true, false, Command::Undo, "Undo"),
    Shortcut::new("Z", true, true, Command::Redo, "Redo"),
    Shortcut::new("Y", true, false, Command::Redo, "Redo"),
    Shortcut::new("Delete", false, false, Command::DeleteSelected, "Delete selected annotation"),
    Shortcut::new("Backspace", false, false, Command::DeleteSelected, "Delete selected annotation"),
    Shortcut::new(" ", false, false, Command::TogglePlayback, "Play / pause"),
    Shortcut::new("ArrowLeft", false, false, Command::SeekBackward, "Seek back 5 seconds"),
    Shortcut::new("ArrowRight", false, false, Command::SeekForward, "Seek forward 5 seconds"),
];

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> &'static [Shortcut] {
        &SHORTCUTS
    }

    /// Command bound to `press`, if any.
    pub fn lookup(press: &KeyPress) -> Option<Command> {
        SHORTCUTS.iter().find(|s| s.matches(press)).map(|s| s.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_chords() {
        assert_eq!(ShortcutRegistry::lookup(&KeyPress::new("z").with_ctrl()), Some(Command::Undo));
        assert_eq!(
            ShortcutRegistry::lookup(&KeyPress::new("Z").with_ctrl().with_shift()),
            Some(Command::Redo)
        );
        assert_eq!(ShortcutRegistry::lookup(&KeyPress::new("y").with_ctrl()), Some(Command::Redo));
        assert_eq!(ShortcutRegistry::lookup(&KeyPress::new("z")), None);
    }

    #[test]
    fn test_delete_keys() {
        assert_eq!(ShortcutRegistry::lookup(&KeyPress::new("Delete")), Some(Command::DeleteSelected));
        assert_eq!(ShortcutRegistry::lookup(&KeyPress::new("Backspace")), Some(Command::DeleteSelected));
        assert_eq!(ShortcutRegistry::lookup(&KeyPress::new("Delete").with_ctrl()), None);
    }

    #[test]
    fn test_format() {
        let formatted: Vec<String> = ShortcutRegistry::all().iter().map(Shortcut::format).collect();
        assert!(formatted.contains(&"Ctrl+Shift+Z".to_string()));
        assert!(formatted.contains(&"Space".to_string()));
    }
}
