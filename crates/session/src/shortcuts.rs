// Keyboard shortcuts for a focused playback session

/// Keys the dispatcher distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
    ArrowLeft,
    ArrowRight,
    Escape,
    Other,
}

impl Key {
    /// Map a platform key name (`" "`, `"k"`, `"ArrowLeft"`, `"Escape"`, ...)
    pub fn from_name(name: &str) -> Self {
        match name {
            " " | "Space" | "Spacebar" => Key::Space,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "Escape" | "Esc" => Key::Escape,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }
}

/// What a mapped key asks the session to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortcutAction {
    TogglePlay,
    ToggleFullscreen,
    ToggleMute,
    /// Relative jump in seconds
    Skip(f64),
    ExitFullscreen,
    Close,
}

/// Stateless key map. A `Some` result means the key is consumed and its
/// default platform behaviour must be suppressed.
#[derive(Debug, Clone, Copy)]
pub struct ShortcutDispatcher {
    skip_seconds: f64,
}

impl ShortcutDispatcher {
    pub fn new(skip_seconds: f64) -> Self {
        Self { skip_seconds }
    }

    pub fn dispatch(&self, key: Key, is_fullscreen: bool) -> Option<ShortcutAction> {
        match key {
            Key::Space | Key::Char('k') => Some(ShortcutAction::TogglePlay),
            Key::Char('f') => Some(ShortcutAction::ToggleFullscreen),
            Key::Char('m') => Some(ShortcutAction::ToggleMute),
            Key::ArrowLeft => Some(ShortcutAction::Skip(-self.skip_seconds)),
            Key::ArrowRight => Some(ShortcutAction::Skip(self.skip_seconds)),
            Key::Escape if is_fullscreen => Some(ShortcutAction::ExitFullscreen),
            Key::Escape => Some(ShortcutAction::Close),
            _ => None,
        }
    }
}

impl Default for ShortcutDispatcher {
    fn default() -> Self {
        Self::new(marquee_core::config::DEFAULT_SKIP_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name(" "), Key::Space);
        assert_eq!(Key::from_name("k"), Key::Char('k'));
        assert_eq!(Key::from_name("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::from_name("ArrowRight"), Key::ArrowRight);
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("Enter"), Key::Other);
    }

    #[test]
    fn test_mapping() {
        let dispatcher = ShortcutDispatcher::default();
        assert_eq!(dispatcher.dispatch(Key::Space, false), Some(ShortcutAction::TogglePlay));
        assert_eq!(dispatcher.dispatch(Key::Char('k'), false), Some(ShortcutAction::TogglePlay));
        assert_eq!(
            dispatcher.dispatch(Key::Char('f'), false),
            Some(ShortcutAction::ToggleFullscreen)
        );
        assert_eq!(dispatcher.dispatch(Key::Char('m'), true), Some(ShortcutAction::ToggleMute));
        assert_eq!(dispatcher.dispatch(Key::ArrowLeft, false), Some(ShortcutAction::Skip(-10.0)));
        assert_eq!(dispatcher.dispatch(Key::ArrowRight, false), Some(ShortcutAction::Skip(10.0)));
    }

    #[test]
    fn test_escape_depends_on_fullscreen() {
        let dispatcher = ShortcutDispatcher::default();
        assert_eq!(dispatcher.dispatch(Key::Escape, true), Some(ShortcutAction::ExitFullscreen));
        assert_eq!(dispatcher.dispatch(Key::Escape, false), Some(ShortcutAction::Close));
    }

    #[test]
    fn test_unmapped_keys_pass_through() {
        let dispatcher = ShortcutDispatcher::default();
        assert_eq!(dispatcher.dispatch(Key::Char('K'), false), None);
        assert_eq!(dispatcher.dispatch(Key::Char('x'), false), None);
        assert_eq!(dispatcher.dispatch(Key::Other, false), None);
    }
}
